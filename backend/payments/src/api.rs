//! Axum REST API handlers.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::auth;
use crate::config::Config;
use crate::db;
use crate::donations::{self, Donation, DonationIntent};
use crate::errors::{PaymentError, Result};
use crate::providers::{AmountUnit, ChargeOutcome};
use crate::router::PaymentRouter;
use crate::webhooks;

pub struct ApiState {
    pub pool: SqlitePool,
    pub payment_router: PaymentRouter,
    pub config: Config,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

/// Outcome of a donation request. The tag makes the continuation case
/// impossible to miss for API consumers.
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DonationCreated {
    /// The rail settled synchronously; the donation is terminal.
    Completed { donation: Donation },
    /// The client must run the rail's confirmation step with this secret;
    /// the terminal state arrives later by webhook.
    RequiresConfirmation {
        donation: Donation,
        #[serde(rename = "clientSecret")]
        client_secret: String,
    },
}

#[derive(Serialize)]
pub struct DonationsResponse {
    pub donations: Vec<Donation>,
    pub total: String,
    pub count: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /donations`
///
/// Validates the intent, dispatches the charge to the selected rail, and
/// persists the donation record. Validation failures return before any
/// provider call; provider rejections surface verbatim.
pub async fn create_donation(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(intent): Json<DonationIntent>,
) -> Result<Json<DonationCreated>> {
    let donor = auth::authenticate(&headers, &state.config.jwt_secret)?;

    let (method, amount) = donations::validate(&intent)?;

    let unit = state
        .payment_router
        .amount_unit(method)
        .unwrap_or(AmountUnit::Major);
    let charge = donations::build_charge(&intent, &donor, amount, unit, &state.config.currency);

    let outcome = state.payment_router.dispatch(method, &charge).await;
    let donation = donations::build_record(
        &intent,
        &donor,
        method,
        amount,
        &state.config.currency,
        &outcome,
    )?;

    db::insert_donation(&state.pool, &donation).await?;
    info!(
        "donation {} created ({}, {} {})",
        donation.id,
        donation.status.as_str(),
        donation.amount,
        method.as_str()
    );

    let response = match outcome {
        ChargeOutcome::PendingConfirmation { client_secret, .. } => {
            DonationCreated::RequiresConfirmation {
                donation,
                client_secret,
            }
        }
        _ => DonationCreated::Completed { donation },
    };
    Ok(Json(response))
}

/// `GET /donations`
///
/// The authenticated donor's donation history.
pub async fn list_donations(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<DonationsResponse>> {
    let donor = auth::authenticate(&headers, &state.config.jwt_secret)?;

    let donations = db::list_for_donor(&state.pool, &donor.id).await?;
    let total: Decimal = donations
        .iter()
        .filter_map(|d| Decimal::from_str(&d.amount).ok())
        .sum();

    Ok(Json(DonationsResponse {
        count: donations.len(),
        total: total.to_string(),
        donations,
    }))
}

/// `POST /webhooks/stripe`
///
/// Raw-body intake; authenticated solely by the provider signature.
pub async fn stripe_webhook(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    let signature = headers
        .get(webhooks::SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(PaymentError::InvalidSignature)?;

    webhooks::reconcile(
        &state.pool,
        &body,
        signature,
        &state.config.stripe_webhook_secret,
    )
    .await?;

    Ok(Json(serde_json::json!({ "received": true })))
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
