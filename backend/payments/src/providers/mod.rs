//! Payment rail adapters.
//!
//! Every rail implements [`PaymentProvider`]: submit one charge, return a
//! normalized [`ChargeOutcome`]. Adapters report expected failures (invalid
//! input, provider rejection) through [`ChargeOutcome::Rejected`]; the `Err`
//! channel is reserved for transport faults, which the router converts into a
//! generic rejection so callers never see infrastructure detail.

mod instasend;
pub mod mock;
mod mpesa;
mod stripe;

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::errors::Result;

pub use instasend::InstasendProvider;
pub use mpesa::MpesaProvider;
pub use stripe::StripeProvider;

/// The unit a rail expects amounts in.
///
/// Declared per adapter so the intent builder never hardcodes which rails
/// take minor units; a new rail with different semantics only touches its own
/// adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountUnit {
    /// Smallest currency denomination (e.g. cents).
    Minor,
    /// Whole currency units.
    Major,
}

impl AmountUnit {
    /// Convert an amount given in major units into this unit.
    pub fn convert(&self, major: Decimal) -> Decimal {
        match self {
            Self::Minor => major * Decimal::from(100),
            Self::Major => major,
        }
    }
}

/// Normalized charge parameters, owned by the router for one dispatch.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Amount in the rail's native unit (see [`AmountUnit`]).
    pub amount: Decimal,
    /// ISO currency code.
    pub currency: String,
    pub description: String,
    /// Carried opaquely through to reconciliation.
    pub metadata: HashMap<String, String>,
    pub customer_email: Option<String>,
    /// Auxiliary payment data (M-Pesa phone number).
    pub phone_number: Option<String>,
}

/// Normalized result of one charge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    /// The rail settled the charge synchronously.
    Settled { transaction_id: String },
    /// The rail created the charge but the client must complete a
    /// confirmation step; the terminal state arrives later by webhook.
    PendingConfirmation {
        transaction_id: String,
        client_secret: String,
    },
    /// The rail rejected the charge.
    Rejected { reason: String },
}

impl ChargeOutcome {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Charge capability implemented by every payment rail.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Unit this rail expects amounts in.
    fn amount_unit(&self) -> AmountUnit {
        AmountUnit::Major
    }

    /// Submit one charge. `Err` means a transport fault; business failures
    /// come back as [`ChargeOutcome::Rejected`].
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome>;
}
