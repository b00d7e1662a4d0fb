//! Stripe card adapter.
//!
//! Creates a payment intent per charge. Intent creation is synchronous and
//! always yields a transaction id; completion is asynchronous and arrives
//! later on the webhook endpoint. When Stripe reports the intent as not yet
//! fully authorized, the outcome carries the client secret the frontend needs
//! for the confirmation step.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use tracing::debug;

use super::{AmountUnit, ChargeOutcome, ChargeRequest, PaymentProvider};
use crate::errors::{PaymentError, Result};

pub struct StripeProvider {
    client: Client,
    api_base: String,
    secret_key: String,
}

impl StripeProvider {
    pub fn new(
        client: Client,
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            secret_key: secret_key.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PaymentIntent {
    id: String,
    status: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Build the form-encoded payment-intent parameters.
fn build_form(request: &ChargeRequest, amount: i64) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), amount.to_string()),
        ("currency".to_string(), request.currency.clone()),
        ("description".to_string(), request.description.clone()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
    ];
    if let Some(email) = &request.customer_email {
        form.push(("receipt_email".to_string(), email.clone()));
    }
    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }
    form
}

/// Map a created payment intent onto the normalized outcome.
fn outcome_from_intent(intent: PaymentIntent) -> Result<ChargeOutcome> {
    if intent.status == "succeeded" {
        return Ok(ChargeOutcome::Settled {
            transaction_id: intent.id,
        });
    }
    let client_secret = intent.client_secret.ok_or_else(|| {
        PaymentError::Provider(format!(
            "payment intent {} in state {} has no client_secret",
            intent.id, intent.status
        ))
    })?;
    Ok(ChargeOutcome::PendingConfirmation {
        transaction_id: intent.id,
        client_secret,
    })
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn amount_unit(&self) -> AmountUnit {
        AmountUnit::Minor
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome> {
        let amount = request.amount.trunc().to_i64().ok_or_else(|| {
            PaymentError::Provider(format!("charge amount out of range: {}", request.amount))
        })?;

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&build_form(request, amount))
            .send()
            .await?;

        if !response.status().is_success() {
            let reason = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| "Stripe payment failed".to_string());
            return Ok(ChargeOutcome::rejected(reason));
        }

        let intent: PaymentIntent = response.json().await?;
        debug!("created payment intent {} ({})", intent.id, intent.status);
        outcome_from_intent(intent)
    }
}
