//! Donation domain types and the intent builder.
//!
//! The intent builder is pure computation: it validates a raw
//! [`DonationIntent`], derives the normalized charge parameters for the
//! selected rail, and constructs the [`Donation`] record once a charge has
//! been accepted. Nothing here touches the database or the network.
//!
//! ## Status as a finite-state machine
//!
//! [`DonationStatus`] is forward-only:
//!
//! ```text
//! pending ──► completed
//!     └─────► failed
//! ```
//!
//! `completed` and `failed` are terminal; the reconciler never transitions a
//! donation out of them (see `db::transition_status`).

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Donor;
use crate::errors::{PaymentError, Result};
use crate::providers::{AmountUnit, ChargeOutcome, ChargeRequest};

// ─────────────────────────────────────────────────────────
// Enums
// ─────────────────────────────────────────────────────────

/// The payment rails the platform accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Card processing via Stripe.
    Card,
    /// M-Pesa mobile money.
    Mpesa,
    /// Instasend cross-border settlement.
    Instasend,
}

impl PaymentMethod {
    /// Parse the wire tag sent by the frontend. Unknown tags are a normal
    /// business outcome (`UnsupportedMethod`), not a deserialization fault.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "card" => Some(Self::Card),
            "mpesa" => Some(Self::Mpesa),
            "instasend" => Some(Self::Instasend),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Mpesa => "mpesa",
            Self::Instasend => "instasend",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum Frequency {
    OneTime,
    Monthly,
    Weekly,
}

impl Default for Frequency {
    fn default() -> Self {
        Self::OneTime
    }
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneTime => "one-time",
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
        }
    }
}

/// Lifecycle status of a donation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DonationStatus {
    /// Charge created, awaiting provider confirmation.
    Pending,
    /// Terminal success.
    Completed,
    /// Terminal failure.
    Failed,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

// ─────────────────────────────────────────────────────────
// Wire input
// ─────────────────────────────────────────────────────────

/// Raw donation request as posted by the frontend.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationIntent {
    /// Target project, or absent / `"general"` for the general fund.
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub frequency: Frequency,
    /// Raw method tag; validated by [`validate`].
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub anonymous: bool,
    /// Auxiliary payment data for the M-Pesa rail.
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Donation category for general-fund donations.
    #[serde(default)]
    pub donation_type: Option<String>,
}

impl DonationIntent {
    fn is_general(&self) -> bool {
        match self.project_id.as_deref() {
            None | Some("general") | Some("") => true,
            Some(_) => false,
        }
    }

    fn target_id(&self) -> &str {
        if self.is_general() {
            "general"
        } else {
            self.project_id.as_deref().unwrap_or("general")
        }
    }
}

/// Minimum accepted donation, in major currency units.
const MIN_AMOUNT: Decimal = Decimal::ONE;

/// Minimum length of an M-Pesa phone number.
const MIN_PHONE_LEN: usize = 10;

/// Validate a raw intent. Rules are applied in order; the first failure wins.
///
/// Returns the resolved method and amount so later builder steps cannot
/// observe unvalidated input.
pub fn validate(intent: &DonationIntent) -> Result<(PaymentMethod, Decimal)> {
    let amount = intent.amount.filter(|a| *a >= MIN_AMOUNT);
    let amount = amount.ok_or(PaymentError::InvalidAmount)?;

    let tag = intent.payment_method.as_deref().unwrap_or("");
    let method = PaymentMethod::from_tag(tag)
        .ok_or_else(|| PaymentError::UnsupportedMethod(tag.to_string()))?;

    if method == PaymentMethod::Mpesa {
        let phone_ok = intent
            .phone_number
            .as_deref()
            .map(|p| p.len() >= MIN_PHONE_LEN)
            .unwrap_or(false);
        if !phone_ok {
            return Err(PaymentError::MissingPhoneNumber);
        }
    }

    Ok((method, amount))
}

/// Build the normalized charge request for one dispatch.
///
/// `unit` is the rail's declared amount unit; the builder itself knows
/// nothing about which rails use minor units.
pub fn build_charge(
    intent: &DonationIntent,
    donor: &Donor,
    amount: Decimal,
    unit: AmountUnit,
    currency: &str,
) -> ChargeRequest {
    let category = intent.donation_type.as_deref().unwrap_or("general");

    let description = if intent.is_general() {
        let label = intent.donation_type.as_deref().unwrap_or("General Fund");
        format!("General donation - {label}")
    } else {
        format!("Donation to project {}", intent.target_id())
    };

    let mut metadata = HashMap::new();
    metadata.insert("projectId".to_string(), intent.target_id().to_string());
    metadata.insert("donorId".to_string(), donor.id.clone());
    metadata.insert("frequency".to_string(), intent.frequency.as_str().to_string());
    metadata.insert("donationType".to_string(), category.to_string());

    ChargeRequest {
        amount: unit.convert(amount),
        currency: currency.to_string(),
        description,
        metadata,
        customer_email: Some(donor.email.clone()),
        phone_number: intent.phone_number.clone(),
    }
}

/// Construct the persisted donation record from an accepted charge.
///
/// The initial status is decided by the outcome shape, not the method tag:
/// a rail that settles synchronously yields `completed`, one that defers to
/// a confirmation step yields `pending`.
pub fn build_record(
    intent: &DonationIntent,
    donor: &Donor,
    method: PaymentMethod,
    amount: Decimal,
    currency: &str,
    outcome: &ChargeOutcome,
) -> Result<Donation> {
    let (status, transaction_id, payment_intent_id) = match outcome {
        ChargeOutcome::Settled { transaction_id } => {
            (DonationStatus::Completed, transaction_id.clone(), None)
        }
        ChargeOutcome::PendingConfirmation { transaction_id, .. } => (
            DonationStatus::Pending,
            transaction_id.clone(),
            Some(transaction_id.clone()),
        ),
        ChargeOutcome::Rejected { reason } => {
            return Err(PaymentError::ProviderRejected(reason.clone()))
        }
    };

    Ok(Donation {
        id: Uuid::new_v4().to_string(),
        donor_id: donor.id.clone(),
        project_id: intent.target_id().to_string(),
        category: intent
            .donation_type
            .clone()
            .unwrap_or_else(|| "general".to_string()),
        amount: amount.to_string(),
        currency: currency.to_string(),
        frequency: intent.frequency,
        payment_method: method,
        message: intent.message.clone(),
        anonymous: intent.anonymous,
        status,
        transaction_id,
        payment_intent_id,
        receipt_ref: format!("/receipts/{}.pdf", Uuid::new_v4().simple()),
        created_at: Utc::now().timestamp(),
    })
}

// ─────────────────────────────────────────────────────────
// Persisted record
// ─────────────────────────────────────────────────────────

/// A donation as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: String,
    pub donor_id: String,
    /// Project identifier, or the `general` sentinel for the general fund.
    pub project_id: String,
    pub category: String,
    /// Decimal amount in major currency units, rendered as a string.
    pub amount: String,
    pub currency: String,
    pub frequency: Frequency,
    pub payment_method: PaymentMethod,
    pub message: Option<String>,
    pub anonymous: bool,
    pub status: DonationStatus,
    /// Provider-assigned transaction identifier.
    pub transaction_id: String,
    /// Provider confirmation token; card rail only.
    pub payment_intent_id: Option<String>,
    pub receipt_ref: String,
    /// Unix timestamp (seconds).
    pub created_at: i64,
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn donor() -> Donor {
        Donor {
            id: "donor-1".to_string(),
            email: "donor@example.com".to_string(),
        }
    }

    fn intent(amount: i64, method: &str) -> DonationIntent {
        DonationIntent {
            amount: Some(Decimal::from(amount)),
            payment_method: Some(method.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn rejects_amount_below_minimum_for_every_method() {
        for method in ["card", "mpesa", "instasend"] {
            let mut i = intent(0, method);
            i.phone_number = Some("254712345678".to_string());
            assert!(matches!(validate(&i), Err(PaymentError::InvalidAmount)));
        }
    }

    #[test]
    fn rejects_missing_amount() {
        let i = DonationIntent {
            payment_method: Some("card".to_string()),
            ..Default::default()
        };
        assert!(matches!(validate(&i), Err(PaymentError::InvalidAmount)));
    }

    #[test]
    fn rejects_unknown_method() {
        let i = intent(50, "bitcoin");
        match validate(&i) {
            Err(PaymentError::UnsupportedMethod(tag)) => assert_eq!(tag, "bitcoin"),
            other => panic!("expected UnsupportedMethod, got {other:?}"),
        }
    }

    #[test]
    fn rejects_short_or_missing_mpesa_phone() {
        let mut i = intent(50, "mpesa");
        i.phone_number = Some("123".to_string());
        assert!(matches!(
            validate(&i),
            Err(PaymentError::MissingPhoneNumber)
        ));

        i.phone_number = None;
        assert!(matches!(
            validate(&i),
            Err(PaymentError::MissingPhoneNumber)
        ));
    }

    #[test]
    fn accepts_valid_mpesa_intent() {
        let mut i = intent(50, "mpesa");
        i.phone_number = Some("254712345678".to_string());
        let (method, amount) = validate(&i).unwrap();
        assert_eq!(method, PaymentMethod::Mpesa);
        assert_eq!(amount, Decimal::from(50));
    }

    #[test]
    fn amount_validation_wins_over_phone_validation() {
        // First failure wins: a sub-minimum M-Pesa intent with a bad phone
        // reports the amount, not the phone.
        let i = intent(0, "mpesa");
        assert!(matches!(validate(&i), Err(PaymentError::InvalidAmount)));
    }

    #[test]
    fn converts_to_minor_units_for_minor_unit_rails() {
        let i = intent(1, "card");
        let charge = build_charge(&i, &donor(), Decimal::ONE, AmountUnit::Minor, "usd");
        assert_eq!(charge.amount, Decimal::from(100));
        assert_eq!(charge.currency, "usd");
    }

    #[test]
    fn keeps_major_units_for_major_unit_rails() {
        let mut i = intent(50, "mpesa");
        i.phone_number = Some("254712345678".to_string());
        let charge = build_charge(&i, &donor(), Decimal::from(50), AmountUnit::Major, "usd");
        assert_eq!(charge.amount, Decimal::from(50));
        assert_eq!(charge.phone_number.as_deref(), Some("254712345678"));
    }

    #[test]
    fn describes_general_and_project_donations() {
        let mut i = intent(25, "card");
        let charge = build_charge(&i, &donor(), Decimal::from(25), AmountUnit::Minor, "usd");
        assert_eq!(charge.description, "General donation - General Fund");
        assert_eq!(charge.metadata["projectId"], "general");

        i.project_id = Some("proj-7".to_string());
        let charge = build_charge(&i, &donor(), Decimal::from(25), AmountUnit::Minor, "usd");
        assert_eq!(charge.description, "Donation to project proj-7");
        assert_eq!(charge.metadata["projectId"], "proj-7");
        assert_eq!(charge.metadata["donorId"], "donor-1");
        assert_eq!(charge.metadata["frequency"], "one-time");
    }

    #[test]
    fn settled_outcome_builds_completed_record() {
        let mut i = intent(50, "mpesa");
        i.phone_number = Some("254712345678".to_string());
        let outcome = ChargeOutcome::Settled {
            transaction_id: "MPESA_123".to_string(),
        };
        let d = build_record(
            &i,
            &donor(),
            PaymentMethod::Mpesa,
            Decimal::from(50),
            "usd",
            &outcome,
        )
        .unwrap();
        assert_eq!(d.status, DonationStatus::Completed);
        assert_eq!(d.transaction_id, "MPESA_123");
        assert!(d.payment_intent_id.is_none());
        assert_eq!(d.amount, "50");
    }

    #[test]
    fn pending_outcome_builds_pending_record_with_intent_id() {
        let i = intent(1, "card");
        let outcome = ChargeOutcome::PendingConfirmation {
            transaction_id: "pi_123".to_string(),
            client_secret: "pi_123_secret".to_string(),
        };
        let d = build_record(
            &i,
            &donor(),
            PaymentMethod::Card,
            Decimal::ONE,
            "usd",
            &outcome,
        )
        .unwrap();
        assert_eq!(d.status, DonationStatus::Pending);
        assert_eq!(d.payment_intent_id.as_deref(), Some("pi_123"));
        assert!(d.receipt_ref.starts_with("/receipts/"));
    }

    #[test]
    fn rejected_outcome_surfaces_the_provider_message() {
        let i = intent(50, "card");
        let outcome = ChargeOutcome::Rejected {
            reason: "Insufficient funds".to_string(),
        };
        match build_record(
            &i,
            &donor(),
            PaymentMethod::Card,
            Decimal::from(50),
            "usd",
            &outcome,
        ) {
            Err(PaymentError::ProviderRejected(msg)) => assert_eq!(msg, "Insufficient funds"),
            other => panic!("expected ProviderRejected, got {other:?}"),
        }
    }

    #[test]
    fn status_terminality() {
        assert!(!DonationStatus::Pending.is_terminal());
        assert!(DonationStatus::Completed.is_terminal());
        assert!(DonationStatus::Failed.is_terminal());
    }
}
