//! Instasend cross-border adapter.
//!
//! Submits a collection request and settles synchronously on a completed
//! response; this rail has no webhook flow in this design.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::{ChargeOutcome, ChargeRequest, PaymentProvider};
use crate::errors::Result;

pub struct InstasendProvider {
    client: Client,
    api_base: String,
    api_key: String,
}

impl InstasendProvider {
    pub fn new(client: Client, api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    tracking_id: Option<String>,
    state: String,
    detail: Option<String>,
}

fn outcome_from_response(response: CollectionResponse) -> ChargeOutcome {
    match (response.state.as_str(), response.tracking_id) {
        ("COMPLETE", Some(id)) => ChargeOutcome::Settled { transaction_id: id },
        _ => ChargeOutcome::rejected(
            response
                .detail
                .unwrap_or_else(|| "Instasend payment failed".to_string()),
        ),
    }
}

#[async_trait]
impl PaymentProvider for InstasendProvider {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome> {
        if request.amount < Decimal::ONE {
            return Ok(ChargeOutcome::rejected("Invalid amount"));
        }

        let response = self
            .client
            .post(format!("{}/api/v1/payment/collection", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "amount": request.amount.normalize().to_string(),
                "currency": request.currency,
                "email": request.customer_email,
                "narrative": request.description,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(ChargeOutcome::rejected("Instasend payment failed"));
        }

        let body: CollectionResponse = response.json().await?;
        debug!("collection state {} ({:?})", body.state, body.tracking_id);
        Ok(outcome_from_response(body))
    }
}
