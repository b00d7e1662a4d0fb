//! Identity boundary — resolves the authenticated donor from a request.
//!
//! Token issuance belongs to the platform's auth service; this module only
//! verifies the HS256 token it finds in the `Authorization` header or the
//! `auth-token` cookie and extracts the donor's identity.

use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::{PaymentError, Result};

const AUTH_COOKIE: &str = "auth-token";

/// The authenticated donor.
#[derive(Debug, Clone)]
pub struct Donor {
    pub id: String,
    pub email: String,
}

/// Claims as issued by the auth service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    pub exp: i64,
}

/// Resolve the donor for the current request, or fail with
/// `AuthenticationRequired`.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<Donor> {
    let token = bearer_token(headers)
        .or_else(|| cookie_token(headers))
        .ok_or(PaymentError::AuthenticationRequired)?;

    let data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| PaymentError::AuthenticationRequired)?;

    Ok(Donor {
        id: data.claims.user_id,
        email: data.claims.email,
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        pair.trim()
            .strip_prefix(AUTH_COOKIE)?
            .strip_prefix('=')
            .map(str::to_string)
    })
}
