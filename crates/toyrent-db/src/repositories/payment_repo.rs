//! Payment repository implementation
//!
//! Payments are append-only apart from gateway reconciliation. Extension
//! metadata lives in a JSONB column and is exchanged as text so the
//! structured record stays a plain serde type.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use toyrent_core::{
    models::{ExtensionMetadata, GatewayTransactionStatus, Payment, PaymentType, TransactionStatus},
    traits::PaymentRepository,
    AppError, AppResult,
};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

/// PostgreSQL implementation of PaymentRepository
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    /// Create a new payment repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn parse_type(s: &str) -> PaymentType {
        PaymentType::from_str(s).unwrap_or_else(|| {
            warn!("Unknown payment type in database: {}", s);
            PaymentType::Rental
        })
    }

    fn parse_transaction_status(s: &str) -> TransactionStatus {
        TransactionStatus::from_str(s).unwrap_or_else(|| {
            warn!("Unknown transaction status in database: {}", s);
            TransactionStatus::Pending
        })
    }

    fn parse_metadata(payment_id: Uuid, raw: Option<String>) -> Option<ExtensionMetadata> {
        let raw = raw?;
        match serde_json::from_str(&raw) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!("Unreadable metadata on payment {}: {}", payment_id, e);
                None
            }
        }
    }

    fn encode_metadata(payment: &Payment) -> AppResult<Option<String>> {
        payment
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(AppError::from)
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    #[instrument(skip(self, payment), fields(payment_id = %payment.id, order_id = %payment.order_id))]
    async fn create(&self, payment: &Payment) -> AppResult<Payment> {
        debug!("Creating payment for rental: {}", payment.rental_id);

        let metadata = Self::encode_metadata(payment)?;

        let row = sqlx::query_as::<sqlx::Postgres, PaymentRow>(
            r#"
            INSERT INTO payments (
                id, rental_id, order_id, payment_type, gross_amount,
                snap_token, snap_url, expiry_time, transaction_time,
                transaction_status, payment_method, va_number, fraud_status,
                metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14::jsonb)
            RETURNING
                id, rental_id, order_id, payment_type, gross_amount,
                snap_token, snap_url, expiry_time, transaction_time,
                transaction_status, payment_method, va_number, fraud_status,
                metadata::text AS metadata, created_at, updated_at
            "#,
        )
        .bind(payment.id)
        .bind(payment.rental_id)
        .bind(&payment.order_id)
        .bind(payment.payment_type.to_string())
        .bind(payment.gross_amount)
        .bind(&payment.snap_token)
        .bind(&payment.snap_url)
        .bind(payment.expiry_time)
        .bind(payment.transaction_time)
        .bind(payment.transaction_status.to_string())
        .bind(&payment.payment_method)
        .bind(&payment.va_number)
        .bind(&payment.fraud_status)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating payment: {}", e);
            AppError::Database(format!("Failed to create payment: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Payment>> {
        debug!("Finding payment by id: {}", id);

        let row = sqlx::query_as::<sqlx::Postgres, PaymentRow>(
            r#"
            SELECT
                id, rental_id, order_id, payment_type, gross_amount,
                snap_token, snap_url, expiry_time, transaction_time,
                transaction_status, payment_method, va_number, fraud_status,
                metadata::text AS metadata, created_at, updated_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding payment {}: {}", id, e);
            AppError::Database(format!("Failed to find payment: {}", e))
        })?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_by_order_id(&self, order_id: &str) -> AppResult<Option<Payment>> {
        debug!("Finding payment by order id: {}", order_id);

        let row = sqlx::query_as::<sqlx::Postgres, PaymentRow>(
            r#"
            SELECT
                id, rental_id, order_id, payment_type, gross_amount,
                snap_token, snap_url, expiry_time, transaction_time,
                transaction_status, payment_method, va_number, fraud_status,
                metadata::text AS metadata, created_at, updated_at
            FROM payments
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding payment for order {}: {}", order_id, e);
            AppError::Database(format!("Failed to find payment: {}", e))
        })?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_by_rental_id(&self, rental_id: Uuid) -> AppResult<Vec<Payment>> {
        let rows = sqlx::query_as::<sqlx::Postgres, PaymentRow>(
            r#"
            SELECT
                id, rental_id, order_id, payment_type, gross_amount,
                snap_token, snap_url, expiry_time, transaction_time,
                transaction_status, payment_method, va_number, fraud_status,
                metadata::text AS metadata, created_at, updated_at
            FROM payments
            WHERE rental_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(rental_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing payments of rental {}: {}", rental_id, e);
            AppError::Database(format!("Failed to list payments: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, status), fields(transaction_status = %status.transaction_status))]
    async fn update_transaction(
        &self,
        id: Uuid,
        status: &GatewayTransactionStatus,
    ) -> AppResult<Payment> {
        let row = sqlx::query_as::<sqlx::Postgres, PaymentRow>(
            r#"
            UPDATE payments
            SET transaction_status = $2,
                payment_method = COALESCE($3, payment_method),
                va_number = COALESCE($4, va_number),
                fraud_status = COALESCE($5, fraud_status),
                transaction_time = COALESCE($6, transaction_time),
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id, rental_id, order_id, payment_type, gross_amount,
                snap_token, snap_url, expiry_time, transaction_time,
                transaction_status, payment_method, va_number, fraud_status,
                metadata::text AS metadata, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status.transaction_status.to_string())
        .bind(&status.payment_method)
        .bind(&status.va_number)
        .bind(&status.fraud_status)
        .bind(status.transaction_time)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating payment {}: {}", id, e);
            AppError::Database(format!("Failed to update payment: {}", e))
        })?;

        row.map(Into::into)
            .ok_or_else(|| AppError::PaymentNotFound(id.to_string()))
    }
}

/// Database row representation of a payment
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    rental_id: Uuid,
    order_id: String,
    payment_type: String,
    gross_amount: Decimal,
    snap_token: Option<String>,
    snap_url: Option<String>,
    expiry_time: Option<DateTime<Utc>>,
    transaction_time: Option<DateTime<Utc>>,
    transaction_status: String,
    payment_method: Option<String>,
    va_number: Option<String>,
    fraud_status: Option<String>,
    metadata: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: row.id,
            rental_id: row.rental_id,
            order_id: row.order_id,
            payment_type: PgPaymentRepository::parse_type(&row.payment_type),
            gross_amount: row.gross_amount,
            snap_token: row.snap_token,
            snap_url: row.snap_url,
            expiry_time: row.expiry_time,
            transaction_time: row.transaction_time,
            transaction_status: PgPaymentRepository::parse_transaction_status(
                &row.transaction_status,
            ),
            payment_method: row.payment_method,
            va_number: row.va_number,
            fraud_status: row.fraud_status,
            metadata: PgPaymentRepository::parse_metadata(row.id, row.metadata),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_type() {
        assert_eq!(
            PgPaymentRepository::parse_type("combined"),
            PaymentType::Combined
        );
        assert_eq!(
            PgPaymentRepository::parse_transaction_status("settlement"),
            TransactionStatus::Settlement
        );
    }

    #[test]
    fn test_metadata_text_round_trip() {
        let now = Utc::now();
        let mut payment = Payment::new(Uuid::new_v4(), PaymentType::Extension, dec!(8000));
        payment
            .set_extension_metadata(ExtensionMetadata {
                old_expected_return_date: now,
                new_expected_return_date: now + Duration::days(2),
                additional_days: 2,
                original_rental_price: dec!(24000),
                additional_cost: dec!(8000),
            })
            .unwrap();

        let encoded = PgPaymentRepository::encode_metadata(&payment).unwrap();
        let decoded = PgPaymentRepository::parse_metadata(payment.id, encoded);
        assert_eq!(decoded, payment.metadata);
    }

    #[test]
    fn test_unreadable_metadata_is_dropped() {
        let decoded =
            PgPaymentRepository::parse_metadata(Uuid::new_v4(), Some("{\"bogus\":1}".to_string()));
        assert!(decoded.is_none());
    }
}
