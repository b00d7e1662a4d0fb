//! Database layer — migrations, the donation repository, and status
//! transitions.

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::donations::{Donation, DonationStatus};
use crate::errors::Result;

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Donation writes
// ─────────────────────────────────────────────────────────

pub async fn insert_donation(pool: &SqlitePool, donation: &Donation) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO donations
            (id, donor_id, project_id, category, amount, currency, frequency,
             payment_method, message, anonymous, status, transaction_id,
             payment_intent_id, receipt_ref, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&donation.id)
    .bind(&donation.donor_id)
    .bind(&donation.project_id)
    .bind(&donation.category)
    .bind(&donation.amount)
    .bind(&donation.currency)
    .bind(donation.frequency)
    .bind(donation.payment_method)
    .bind(&donation.message)
    .bind(donation.anonymous)
    .bind(donation.status)
    .bind(&donation.transaction_id)
    .bind(&donation.payment_intent_id)
    .bind(&donation.receipt_ref)
    .bind(donation.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Result of a conditional status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    /// The donation was `pending` and moved to the new status.
    Applied,
    /// The donation already sits in a terminal status; nothing changed.
    AlreadyTerminal(DonationStatus),
    /// No donation carries this transaction id (yet).
    NotFound,
}

/// Move a donation to a terminal status, conditioned on it still being
/// `pending`. The guard lives in the `UPDATE` itself so concurrent
/// deliveries for the same donation cannot interleave a read-modify-write.
pub async fn transition_status(
    pool: &SqlitePool,
    transaction_id: &str,
    new_status: DonationStatus,
) -> Result<StatusTransition> {
    let rows_affected = sqlx::query(
        "UPDATE donations SET status = ?1 WHERE transaction_id = ?2 AND status = 'pending'",
    )
    .bind(new_status)
    .bind(transaction_id)
    .execute(pool)
    .await?
    .rows_affected();

    if rows_affected > 0 {
        return Ok(StatusTransition::Applied);
    }

    match get_by_transaction(pool, transaction_id).await? {
        Some(donation) => Ok(StatusTransition::AlreadyTerminal(donation.status)),
        None => Ok(StatusTransition::NotFound),
    }
}

// ─────────────────────────────────────────────────────────
// Donation reads
// ─────────────────────────────────────────────────────────

pub async fn get_by_transaction(
    pool: &SqlitePool,
    transaction_id: &str,
) -> Result<Option<Donation>> {
    let row = sqlx::query_as::<_, Donation>(
        r#"
        SELECT id, donor_id, project_id, category, amount, currency, frequency,
               payment_method, message, anonymous, status, transaction_id,
               payment_intent_id, receipt_ref, created_at
        FROM   donations
        WHERE  transaction_id = ?1
        "#,
    )
    .bind(transaction_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Fetch a donor's donations, newest first.
pub async fn list_for_donor(pool: &SqlitePool, donor_id: &str) -> Result<Vec<Donation>> {
    let rows = sqlx::query_as::<_, Donation>(
        r#"
        SELECT id, donor_id, project_id, category, amount, currency, frequency,
               payment_method, message, anonymous, status, transaction_id,
               payment_intent_id, receipt_ref, created_at
        FROM   donations
        WHERE  donor_id = ?1
        ORDER  BY created_at DESC, id DESC
        "#,
    )
    .bind(donor_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::donations::{Frequency, PaymentMethod};

    // A single connection keeps every query on the same in-memory database.
    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn donation(transaction_id: &str, status: DonationStatus) -> Donation {
        Donation {
            id: format!("don-{transaction_id}"),
            donor_id: "donor-1".to_string(),
            project_id: "general".to_string(),
            category: "general".to_string(),
            amount: "50".to_string(),
            currency: "usd".to_string(),
            frequency: Frequency::OneTime,
            payment_method: PaymentMethod::Card,
            message: None,
            anonymous: false,
            status,
            transaction_id: transaction_id.to_string(),
            payment_intent_id: Some(transaction_id.to_string()),
            receipt_ref: "/receipts/r1.pdf".to_string(),
            created_at: 1_704_067_200,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_roundtrip() {
        let pool = test_pool().await;
        insert_donation(&pool, &donation("pi_1", DonationStatus::Pending))
            .await
            .unwrap();

        let found = get_by_transaction(&pool, "pi_1").await.unwrap().unwrap();
        assert_eq!(found.status, DonationStatus::Pending);
        assert_eq!(found.payment_method, PaymentMethod::Card);
        assert_eq!(found.frequency, Frequency::OneTime);
        assert_eq!(found.amount, "50");

        assert!(get_by_transaction(&pool, "pi_missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn pending_donation_transitions_once() {
        let pool = test_pool().await;
        insert_donation(&pool, &donation("pi_1", DonationStatus::Pending))
            .await
            .unwrap();

        let first = transition_status(&pool, "pi_1", DonationStatus::Completed)
            .await
            .unwrap();
        assert_eq!(first, StatusTransition::Applied);

        // Redelivery of the same event is a silent no-op.
        let second = transition_status(&pool, "pi_1", DonationStatus::Completed)
            .await
            .unwrap();
        assert_eq!(
            second,
            StatusTransition::AlreadyTerminal(DonationStatus::Completed)
        );
    }

    #[tokio::test]
    async fn terminal_status_never_reverts() {
        let pool = test_pool().await;
        insert_donation(&pool, &donation("pi_1", DonationStatus::Pending))
            .await
            .unwrap();

        transition_status(&pool, "pi_1", DonationStatus::Failed)
            .await
            .unwrap();

        // A late success event cannot resurrect a failed donation.
        let result = transition_status(&pool, "pi_1", DonationStatus::Completed)
            .await
            .unwrap();
        assert_eq!(
            result,
            StatusTransition::AlreadyTerminal(DonationStatus::Failed)
        );

        let current = get_by_transaction(&pool, "pi_1").await.unwrap().unwrap();
        assert_eq!(current.status, DonationStatus::Failed);
    }

    #[tokio::test]
    async fn unknown_transaction_reports_not_found() {
        let pool = test_pool().await;
        let result = transition_status(&pool, "pi_ghost", DonationStatus::Completed)
            .await
            .unwrap();
        assert_eq!(result, StatusTransition::NotFound);
    }

    #[tokio::test]
    async fn list_filters_by_donor_newest_first() {
        let pool = test_pool().await;

        let mut first = donation("pi_1", DonationStatus::Completed);
        first.created_at = 100;
        let mut second = donation("pi_2", DonationStatus::Completed);
        second.created_at = 200;
        let mut other = donation("pi_3", DonationStatus::Completed);
        other.donor_id = "donor-2".to_string();

        for d in [&first, &second, &other] {
            insert_donation(&pool, d).await.unwrap();
        }

        let rows = list_for_donor(&pool, "donor-1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].transaction_id, "pi_2");
        assert_eq!(rows[1].transaction_id, "pi_1");
    }
}
