//! In-memory rail fakes.
//!
//! Implement the same [`PaymentProvider`] contract as the live adapters,
//! with no outbound calls. Used by the test suite and by sandbox-mode
//! deployments (the platform's demo environments run all-sandbox).

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{AmountUnit, ChargeOutcome, ChargeRequest, PaymentProvider};
use crate::errors::Result;

const MIN_PHONE_LEN: usize = 10;

fn rail_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}_{}", Utc::now().timestamp_millis(), &suffix[..9])
}

/// Card fake: mirrors the live rail's pending/confirm flow.
#[derive(Default)]
pub struct MockCardProvider {
    fail_next: AtomicBool,
}

impl MockCardProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next charge come back rejected.
    pub fn set_fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentProvider for MockCardProvider {
    fn amount_unit(&self) -> AmountUnit {
        AmountUnit::Minor
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Ok(ChargeOutcome::rejected("Card declined"));
        }
        if request.amount < Decimal::ONE {
            return Ok(ChargeOutcome::rejected("Invalid amount"));
        }
        let id = format!("pi_mock_{}", Uuid::new_v4().simple());
        Ok(ChargeOutcome::PendingConfirmation {
            client_secret: format!("{id}_secret_{}", Uuid::new_v4().simple()),
            transaction_id: id,
        })
    }
}

/// Mobile-money fake: enforces the rail's validation contract and settles
/// synchronously, like the live adapter.
#[derive(Default)]
pub struct MockMpesaProvider;

impl MockMpesaProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentProvider for MockMpesaProvider {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome> {
        if request.amount < Decimal::ONE {
            return Ok(ChargeOutcome::rejected("Invalid amount"));
        }
        let phone_ok = request
            .phone_number
            .as_deref()
            .map(|p| p.len() >= MIN_PHONE_LEN)
            .unwrap_or(false);
        if !phone_ok {
            return Ok(ChargeOutcome::rejected("Invalid phone number"));
        }
        Ok(ChargeOutcome::Settled {
            transaction_id: rail_id("MPESA"),
        })
    }
}

/// Cross-border fake.
#[derive(Default)]
pub struct MockInstasendProvider;

impl MockInstasendProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentProvider for MockInstasendProvider {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome> {
        if request.amount < Decimal::ONE {
            return Ok(ChargeOutcome::rejected("Invalid amount"));
        }
        Ok(ChargeOutcome::Settled {
            transaction_id: rail_id("INSTASEND"),
        })
    }
}
