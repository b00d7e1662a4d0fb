//! Webhook reconciliation — signature verification and donation state
//! transitions driven by provider events.
//!
//! Verification operates on the raw request bytes, never on a re-serialized
//! body: re-encoding would change formatting and break the HMAC. Events are
//! applied idempotently; provider delivery is at-least-once, so a duplicate
//! or late event for an already-terminal donation is a silent no-op. An
//! event whose transaction id is not persisted yet is answered with
//! not-found so the provider's retry loop redelivers it later.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use sqlx::SqlitePool;
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::db::{self, StatusTransition};
use crate::donations::DonationStatus;
use crate::errors::{PaymentError, Result};

/// Header carrying the provider signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum accepted age of a signed payload, in seconds.
const TOLERANCE_SECS: i64 = 300;

// ─────────────────────────────────────────────────────────
// Signature verification
// ─────────────────────────────────────────────────────────

/// Parse the `t=<timestamp>,v1=<hex>` signature header.
fn parse_signature_header(header: &str) -> Result<(i64, String)> {
    let mut timestamp = None;
    let mut v1 = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => v1 = Some(value.to_string()),
            _ => {}
        }
    }

    match (timestamp, v1) {
        (Some(t), Some(sig)) if !sig.is_empty() => Ok((t, sig)),
        _ => Err(PaymentError::InvalidSignature),
    }
}

/// Verify an HMAC-SHA256 signature over `<timestamp>.<payload>`.
///
/// Comparison is constant-time; payloads older than [`TOLERANCE_SECS`]
/// are rejected to bound replays.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str) -> Result<()> {
    let (timestamp, provided) = parse_signature_header(header)?;

    let now = chrono::Utc::now().timestamp();
    if (now - timestamp).abs() > TOLERANCE_SECS {
        return Err(PaymentError::InvalidSignature);
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
        Ok(())
    } else {
        Err(PaymentError::InvalidSignature)
    }
}

// ─────────────────────────────────────────────────────────
// Event shapes
// ─────────────────────────────────────────────────────────

/// Provider event kinds this service reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PaymentSucceeded,
    PaymentFailed,
    /// Everything else; acknowledged but not applied. Providers add new
    /// event types over time.
    Unrecognized,
}

impl EventKind {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "payment_intent.succeeded" => Self::PaymentSucceeded,
            "payment_intent.payment_failed" => Self::PaymentFailed,
            _ => Self::Unrecognized,
        }
    }

    fn target_status(&self) -> Option<DonationStatus> {
        match self {
            Self::PaymentSucceeded => Some(DonationStatus::Completed),
            Self::PaymentFailed => Some(DonationStatus::Failed),
            Self::Unrecognized => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Debug, Deserialize)]
struct WebhookObject {
    id: String,
}

// ─────────────────────────────────────────────────────────
// Reconciliation
// ─────────────────────────────────────────────────────────

/// What a verified delivery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The donation moved to this terminal status.
    Applied(DonationStatus),
    /// The donation was already terminal; nothing changed.
    AlreadySettled(DonationStatus),
    /// Unrecognized event type; acknowledged without state change.
    Ignored,
}

/// Verify and apply one webhook delivery.
///
/// Signature failure rejects before any state is touched. A success or
/// failure event for a transaction id with no persisted donation yields
/// [`PaymentError::DonationNotFound`] so the caller answers non-2xx and the
/// provider redelivers.
pub async fn reconcile(
    pool: &SqlitePool,
    payload: &[u8],
    signature: &str,
    secret: &str,
) -> Result<Reconciliation> {
    verify_signature(payload, signature, secret)?;

    let event: WebhookEvent = serde_json::from_slice(payload)?;
    let kind = EventKind::from_type(&event.event_type);

    let Some(target) = kind.target_status() else {
        debug!("ignoring webhook event type {}", event.event_type);
        return Ok(Reconciliation::Ignored);
    };

    let transaction_id = event
        .data
        .map(|d| d.object.id)
        .ok_or_else(|| PaymentError::Provider("webhook event has no object id".to_string()))?;

    match db::transition_status(pool, &transaction_id, target).await? {
        StatusTransition::Applied => {
            info!(
                "donation for transaction {transaction_id} reconciled to {}",
                target.as_str()
            );
            Ok(Reconciliation::Applied(target))
        }
        StatusTransition::AlreadyTerminal(current) => {
            debug!(
                "transaction {transaction_id} already {}, event dropped",
                current.as_str()
            );
            Ok(Reconciliation::AlreadySettled(current))
        }
        StatusTransition::NotFound => Err(PaymentError::DonationNotFound(transaction_id)),
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
