//! Application-wide error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Minimum donation amount is 1")]
    InvalidAmount,

    #[error("Unsupported payment method: {0}")]
    UnsupportedMethod(String),

    #[error("Valid phone number required for M-Pesa")]
    MissingPhoneNumber,

    #[error("{0}")]
    ProviderRejected(String),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("No donation found for transaction {0}")]
    DonationNotFound(String),

    #[error("Provider response error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PaymentError>;

impl PaymentError {
    /// Stable machine-readable kind for API consumers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "invalid_amount",
            Self::UnsupportedMethod(_) => "unsupported_method",
            Self::MissingPhoneNumber => "missing_phone_number",
            Self::ProviderRejected(_) => "provider_rejected",
            Self::AuthenticationRequired => "authentication_required",
            Self::InvalidSignature => "invalid_signature",
            Self::DonationNotFound(_) => "not_found",
            _ => "internal",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAmount
            | Self::UnsupportedMethod(_)
            | Self::MissingPhoneNumber
            | Self::ProviderRejected(_)
            | Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::DonationNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Infrastructure details stay in the logs, not in the response body.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({
            "kind": self.kind(),
            "error": message,
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_400() {
        assert_eq!(
            PaymentError::InvalidAmount.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PaymentError::UnsupportedMethod("bitcoin".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PaymentError::MissingPhoneNumber.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PaymentError::InvalidSignature.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn auth_and_lookup_errors_keep_their_status() {
        assert_eq!(
            PaymentError::AuthenticationRequired.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            PaymentError::DonationNotFound("tx_1".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(PaymentError::InvalidAmount.kind(), "invalid_amount");
        assert_eq!(
            PaymentError::ProviderRejected("Insufficient funds".into()).kind(),
            "provider_rejected"
        );
        assert_eq!(PaymentError::Config("x".into()).kind(), "internal");
    }
}
