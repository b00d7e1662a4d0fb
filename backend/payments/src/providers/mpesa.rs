//! M-Pesa mobile-money adapter.
//!
//! Issues an STK-push style collection request. The rail settles
//! synchronously in this design; there is no later webhook for it.
//!
//! The adapter re-validates amount and phone number even though the intent
//! builder already did: the thresholds are part of this rail's contract and
//! hold for direct callers too.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::{ChargeOutcome, ChargeRequest, PaymentProvider};
use crate::errors::Result;

const MIN_PHONE_LEN: usize = 10;

pub struct MpesaProvider {
    client: Client,
    api_base: String,
    api_key: String,
}

impl MpesaProvider {
    pub fn new(client: Client, api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StkPushResponse {
    #[serde(rename = "ResponseCode")]
    response_code: String,
    #[serde(rename = "ResponseDescription")]
    response_description: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: Option<String>,
}

fn outcome_from_response(response: StkPushResponse) -> ChargeOutcome {
    if response.response_code == "0" {
        match response.checkout_request_id {
            Some(id) => ChargeOutcome::Settled { transaction_id: id },
            None => ChargeOutcome::rejected("M-Pesa payment failed"),
        }
    } else {
        ChargeOutcome::rejected(
            response
                .response_description
                .unwrap_or_else(|| "M-Pesa payment failed".to_string()),
        )
    }
}

#[async_trait]
impl PaymentProvider for MpesaProvider {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome> {
        if request.amount < Decimal::ONE {
            return Ok(ChargeOutcome::rejected("Invalid amount"));
        }
        let phone = match request.phone_number.as_deref() {
            Some(p) if p.len() >= MIN_PHONE_LEN => p,
            _ => return Ok(ChargeOutcome::rejected("Invalid phone number")),
        };

        let account_reference = request
            .metadata
            .get("projectId")
            .cloned()
            .unwrap_or_else(|| "general".to_string());

        let response = self
            .client
            .post(format!(
                "{}/mpesa/stkpush/v1/processrequest",
                self.api_base
            ))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "Amount": request.amount.normalize().to_string(),
                "PhoneNumber": phone,
                "TransactionDesc": request.description,
                "AccountReference": account_reference,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(ChargeOutcome::rejected("M-Pesa payment failed"));
        }

        let body: StkPushResponse = response.json().await?;
        debug!(
            "stk push response code {} ({:?})",
            body.response_code, body.checkout_request_id
        );
        Ok(outcome_from_response(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_push_settles_with_checkout_id() {
        let outcome = outcome_from_response(StkPushResponse {
            response_code: "0".to_string(),
            response_description: Some("Success".to_string()),
            checkout_request_id: Some("ws_CO_1".to_string()),
        });
        assert_eq!(
            outcome,
            ChargeOutcome::Settled {
                transaction_id: "ws_CO_1".to_string()
            }
        );
    }

    #[test]
    fn non_zero_code_rejects_with_description() {
        let outcome = outcome_from_response(StkPushResponse {
            response_code: "1032".to_string(),
            response_description: Some("Request cancelled by user".to_string()),
            checkout_request_id: None,
        });
        assert_eq!(
            outcome,
            ChargeOutcome::rejected("Request cancelled by user")
        );
    }

    #[test]
    fn accepted_push_without_id_rejects() {
        let outcome = outcome_from_response(StkPushResponse {
            response_code: "0".to_string(),
            response_description: None,
            checkout_request_id: None,
        });
        assert_eq!(outcome, ChargeOutcome::rejected("M-Pesa payment failed"));
    }
}
