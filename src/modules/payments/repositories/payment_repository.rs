use super::super::models::{Payment, PaymentStatus};
use crate::core::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

/// Persistence for payment rows
///
/// `transition_status` is the single concurrency-control point of the whole core:
/// webhook delivery may land on a different instance than the one that created the
/// row, so the guard is a conditional database update, not an in-process lock.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: &Payment) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Payment>>;

    async fn find_by_processor_ref(&self, processor_payment_id: &str) -> Result<Option<Payment>>;

    /// Record the processor-side artifact id (and expiry, for instant transfer)
    /// once the intent exists
    async fn attach_intent(
        &self,
        id: &str,
        processor_payment_id: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Store the reusable payment-method token reported by the processor
    async fn attach_method_ref(&self, id: &str, method_ref: &str) -> Result<()>;

    /// Apply `from -> to` only if the row's current status is `from`
    ///
    /// Returns `true` when the transition was applied by this call. A `false`
    /// return means another writer got there first (or the row moved elsewhere);
    /// callers re-read and decide.
    async fn transition_status(
        &self,
        id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool>;
}

/// MySQL-backed payment repository
pub struct SqlPaymentRepository {
    pool: MySqlPool,
}

impl SqlPaymentRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

const PAYMENT_COLUMNS: &str = r#"
    id, product_id, offer_id, processor_id, processor_payment_id,
    amount, currency, status, payment_method_ref, origin_payment_id,
    buyer_email, buyer_name, buyer_phone, buyer_tax_id,
    metadata, expires_at, created_at, updated_at
"#;

#[async_trait]
impl PaymentRepository for SqlPaymentRepository {
    async fn create(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, product_id, offer_id, processor_id, processor_payment_id,
                amount, currency, status, payment_method_ref, origin_payment_id,
                buyer_email, buyer_name, buyer_phone, buyer_tax_id,
                metadata, expires_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.product_id)
        .bind(&payment.offer_id)
        .bind(&payment.processor_id)
        .bind(&payment.processor_payment_id)
        .bind(payment.amount)
        .bind(payment.currency.to_string())
        .bind(payment.status)
        .bind(&payment.payment_method_ref)
        .bind(&payment.origin_payment_id)
        .bind(&payment.buyer_email)
        .bind(&payment.buyer_name)
        .bind(&payment.buyer_phone)
        .bind(&payment.buyer_tax_id)
        .bind(&payment.metadata)
        .bind(payment.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {} FROM payments WHERE id = ?",
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn find_by_processor_ref(&self, processor_payment_id: &str) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {} FROM payments WHERE processor_payment_id = ?",
            PAYMENT_COLUMNS
        ))
        .bind(processor_payment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn attach_intent(
        &self,
        id: &str,
        processor_payment_id: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE payments
            SET processor_payment_id = ?, expires_at = ?, updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(processor_payment_id)
        .bind(expires_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn attach_method_ref(&self, id: &str, method_ref: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE payments
            SET payment_method_ref = ?, updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(method_ref)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn transition_status(
        &self,
        id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = ?, updated_at = NOW()
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(to)
        .bind(id)
        .bind(from)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
