//! Rental repository implementation
//!
//! Provides PostgreSQL-backed storage for rentals and their items. Every
//! write that also moves stock shares one transaction with the stock update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use toyrent_core::{
    models::{
        Customer, ItemCondition, ItemReturn, PaymentStatus, Rental, RentalItem, RentalItemStatus,
        RentalStatus,
    },
    traits::RentalRepository,
    AppError, AppResult,
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::inventory_repo::{release_stock, reserve_stock};

/// PostgreSQL implementation of RentalRepository
pub struct PgRentalRepository {
    pool: PgPool,
}

impl PgRentalRepository {
    /// Create a new rental repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<sqlx::Transaction<'static, sqlx::Postgres>> {
        self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })
    }

    async fn commit(tx: sqlx::Transaction<'static, sqlx::Postgres>) -> AppResult<()> {
        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })
    }

    fn parse_status(s: &str) -> RentalStatus {
        RentalStatus::from_str(s).unwrap_or_else(|| {
            warn!("Unknown rental status in database: {}", s);
            RentalStatus::Pending
        })
    }

    fn parse_payment_status(s: &str) -> PaymentStatus {
        PaymentStatus::from_str(s).unwrap_or_else(|| {
            warn!("Unknown payment status in database: {}", s);
            PaymentStatus::Unpaid
        })
    }

    fn parse_condition(s: &str) -> ItemCondition {
        ItemCondition::from_str(s).unwrap_or_else(|| {
            warn!("Unknown item condition in database: {}", s);
            ItemCondition::Good
        })
    }

    fn parse_item_status(s: &str) -> RentalItemStatus {
        RentalItemStatus::from_str(s).unwrap_or_else(|| {
            warn!("Unknown item status in database: {}", s);
            RentalItemStatus::Rented
        })
    }
}

/// Load a rental with its items and customer on an existing connection
async fn fetch_rental(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<Rental>> {
    let row = sqlx::query_as::<sqlx::Postgres, RentalRow>(
        r#"
        SELECT
            r.id, r.user_id, r.status,
            r.rental_date, r.expected_return_date, r.actual_return_date,
            r.total_rental_price, r.late_fee, r.damage_fee, r.total_amount,
            r.payment_status, r.notes, r.created_at, r.updated_at,
            u.full_name AS customer_name,
            u.email AS customer_email,
            u.phone AS customer_phone
        FROM rentals r
        LEFT JOIN users u ON u.id = r.user_id
        WHERE r.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| {
        error!("Database error finding rental {}: {}", id, e);
        AppError::Database(format!("Failed to find rental: {}", e))
    })?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items = sqlx::query_as::<sqlx::Postgres, RentalItemRow>(
        r#"
        SELECT
            ri.id, ri.rental_id, ri.toy_id, t.name AS toy_name,
            ri.quantity, ri.price_per_unit,
            ri.condition_before, ri.condition_after, ri.status,
            ri.damage_fee, ri.damage_description
        FROM rental_items ri
        LEFT JOIN toys t ON t.id = ri.toy_id
        WHERE ri.rental_id = $1
        ORDER BY ri.created_at, ri.id
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        error!("Database error loading items of rental {}: {}", id, e);
        AppError::Database(format!("Failed to load rental items: {}", e))
    })?;

    let mut rental: Rental = row.into();
    rental.items = items.into_iter().map(Into::into).collect();
    Ok(Some(rental))
}

async fn fetch_existing(conn: &mut PgConnection, id: Uuid) -> AppResult<Rental> {
    fetch_rental(conn, id)
        .await?
        .ok_or_else(|| AppError::RentalNotFound(id.to_string()))
}

/// Update one item to its returned state and put its units back in stock
async fn write_item_return(
    conn: &mut PgConnection,
    rental_id: Uuid,
    item: &ItemReturn,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE rental_items
        SET condition_after = $3,
            status = $4,
            damage_fee = $5,
            damage_description = $6,
            updated_at = NOW()
        WHERE id = $1 AND rental_id = $2 AND status = 'rented'
        "#,
    )
    .bind(item.item_id)
    .bind(rental_id)
    .bind(item.condition_after.as_str())
    .bind(item.status.to_string())
    .bind(item.damage_fee)
    .bind(&item.damage_description)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        error!("Database error updating rental item {}: {}", item.item_id, e);
        AppError::Database(format!("Failed to update rental item: {}", e))
    })?;

    if result.rows_affected() == 0 {
        // Either unknown or already returned; only the former is an error
        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM rental_items WHERE id = $1 AND rental_id = $2")
                .bind(item.item_id)
                .bind(rental_id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| {
                    error!("Database error loading rental item {}: {}", item.item_id, e);
                    AppError::Database(format!("Failed to load rental item: {}", e))
                })?;
        return match exists {
            Some(_) => Ok(()),
            None => Err(AppError::RentalItemNotFound(item.item_id.to_string())),
        };
    }

    release_stock(conn, item.toy_id, item.quantity).await
}

/// Store the rental-level fields a return produces
async fn write_rental_return(conn: &mut PgConnection, rental: &Rental) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE rentals
        SET status = $2,
            actual_return_date = $3,
            late_fee = $4,
            damage_fee = $5,
            total_amount = $6,
            notes = $7,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(rental.id)
    .bind(rental.status.to_string())
    .bind(rental.actual_return_date)
    .bind(rental.late_fee)
    .bind(rental.damage_fee)
    .bind(rental.total_amount)
    .bind(&rental.notes)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        error!("Database error recording return of rental {}: {}", rental.id, e);
        AppError::Database(format!("Failed to record return: {}", e))
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::RentalNotFound(rental.id.to_string()));
    }
    Ok(())
}

#[async_trait]
impl RentalRepository for PgRentalRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Rental>> {
        debug!("Finding rental by id: {}", id);

        let mut conn = self.pool.acquire().await?;
        fetch_rental(&mut conn, id).await
    }

    #[instrument(skip(self, rental), fields(rental_id = %rental.id, items = rental.items.len()))]
    async fn create_with_items(&self, rental: &Rental) -> AppResult<Rental> {
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO rentals (
                id, user_id, status,
                rental_date, expected_return_date, actual_return_date,
                total_rental_price, late_fee, damage_fee, total_amount,
                payment_status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(rental.id)
        .bind(rental.user_id)
        .bind(rental.status.to_string())
        .bind(rental.rental_date)
        .bind(rental.expected_return_date)
        .bind(rental.actual_return_date)
        .bind(rental.total_rental_price)
        .bind(rental.late_fee)
        .bind(rental.damage_fee)
        .bind(rental.total_amount)
        .bind(rental.payment_status.to_string())
        .bind(&rental.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error creating rental: {}", e);
            AppError::Database(format!("Failed to create rental: {}", e))
        })?;

        for item in &rental.items {
            sqlx::query(
                r#"
                INSERT INTO rental_items (
                    id, rental_id, toy_id, quantity, price_per_unit,
                    condition_before, condition_after, status,
                    damage_fee, damage_description
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(item.id)
            .bind(rental.id)
            .bind(item.toy_id)
            .bind(item.quantity)
            .bind(item.price_per_unit)
            .bind(item.condition_before.as_str())
            .bind(item.condition_after.as_str())
            .bind(item.status.to_string())
            .bind(item.damage_fee)
            .bind(&item.damage_description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Database error creating rental item: {}", e);
                AppError::Database(format!("Failed to create rental item: {}", e))
            })?;

            reserve_stock(&mut tx, item.toy_id, item.quantity).await?;
        }

        let created = fetch_existing(&mut tx, rental.id).await?;
        Self::commit(tx).await?;

        info!(rental_id = %created.id, "Rental created");
        Ok(created)
    }

    #[instrument(skip(self, item), fields(item_id = %item.item_id))]
    async fn return_item(&self, rental_id: Uuid, item: &ItemReturn) -> AppResult<()> {
        let mut tx = self.begin().await?;
        write_item_return(&mut tx, rental_id, item).await?;
        Self::commit(tx).await
    }

    #[instrument(skip(self, rental), fields(rental_id = %rental.id))]
    async fn record_return(&self, rental: &Rental) -> AppResult<Rental> {
        let mut tx = self.begin().await?;
        write_rental_return(&mut tx, rental).await?;
        let updated = fetch_existing(&mut tx, rental.id).await?;
        Self::commit(tx).await?;
        Ok(updated)
    }

    #[instrument(skip(self, rental, items), fields(rental_id = %rental.id, items = items.len()))]
    async fn return_atomically(&self, rental: &Rental, items: &[ItemReturn]) -> AppResult<Rental> {
        let mut tx = self.begin().await?;

        for item in items {
            write_item_return(&mut tx, rental.id, item).await?;
        }
        write_rental_return(&mut tx, rental).await?;

        let updated = fetch_existing(&mut tx, rental.id).await?;
        Self::commit(tx).await?;
        Ok(updated)
    }

    #[instrument(skip(self, notes))]
    async fn apply_extension(
        &self,
        id: Uuid,
        new_expected_return_date: DateTime<Utc>,
        additional_cost: Decimal,
        notes: Option<String>,
    ) -> AppResult<Rental> {
        let mut tx = self.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE rentals
            SET expected_return_date = $2,
                total_rental_price = total_rental_price + $3,
                notes = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(new_expected_return_date)
        .bind(additional_cost)
        .bind(&notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error extending rental {}: {}", id, e);
            AppError::Database(format!("Failed to extend rental: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::RentalNotFound(id.to_string()));
        }

        let updated = fetch_existing(&mut tx, id).await?;
        Self::commit(tx).await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn rollback_extension(
        &self,
        id: Uuid,
        old_expected_return_date: DateTime<Utc>,
        original_rental_price: Decimal,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE rentals
            SET expected_return_date = $2,
                total_rental_price = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(old_expected_return_date)
        .bind(original_rental_price)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error rolling back extension of rental {}: {}", id, e);
            AppError::Database(format!("Failed to roll back extension: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::RentalNotFound(id.to_string()));
        }

        info!(rental_id = %id, "Extension rolled back");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_payment_status(&self, id: Uuid, status: PaymentStatus) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE rentals SET payment_status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating payment status of rental {}: {}", id, e);
            AppError::Database(format!("Failed to update payment status: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::RentalNotFound(id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_status(&self, id: Uuid, status: RentalStatus) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE rentals SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    error!("Database error updating status of rental {}: {}", id, e);
                    AppError::Database(format!("Failed to update rental status: {}", e))
                })?;

        if result.rows_affected() == 0 {
            return Err(AppError::RentalNotFound(id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn cancel(&self, id: Uuid) -> AppResult<Rental> {
        let mut tx = self.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE rentals
            SET status = 'cancelled',
                updated_at = NOW()
            WHERE id = $1
              AND status NOT IN ('completed', 'cancelled')
              AND actual_return_date IS NULL
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error cancelling rental {}: {}", id, e);
            AppError::Database(format!("Failed to cancel rental: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::AlreadyFinalized(id.to_string()));
        }

        let outstanding: Vec<(Uuid, i32)> = sqlx::query_as(
            "SELECT toy_id, quantity FROM rental_items WHERE rental_id = $1 AND status = 'rented'",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error loading items of rental {}: {}", id, e);
            AppError::Database(format!("Failed to load rental items: {}", e))
        })?;

        for (toy_id, quantity) in outstanding {
            release_stock(&mut tx, toy_id, quantity).await?;
        }

        let cancelled = fetch_existing(&mut tx, id).await?;
        Self::commit(tx).await?;

        info!(rental_id = %id, "Rental cancelled");
        Ok(cancelled)
    }
}

/// Database row representation of a rental
#[derive(Debug, sqlx::FromRow)]
struct RentalRow {
    id: Uuid,
    user_id: Uuid,
    status: String,
    rental_date: DateTime<Utc>,
    expected_return_date: DateTime<Utc>,
    actual_return_date: Option<DateTime<Utc>>,
    total_rental_price: Decimal,
    late_fee: Decimal,
    damage_fee: Decimal,
    total_amount: Decimal,
    payment_status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    customer_name: Option<String>,
    customer_email: Option<String>,
    customer_phone: Option<String>,
}

impl From<RentalRow> for Rental {
    fn from(row: RentalRow) -> Self {
        let customer = match (row.customer_name, row.customer_email) {
            (Some(full_name), Some(email)) => Some(Customer {
                full_name,
                email,
                phone: row.customer_phone,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            user_id: row.user_id,
            status: PgRentalRepository::parse_status(&row.status),
            rental_date: row.rental_date,
            expected_return_date: row.expected_return_date,
            actual_return_date: row.actual_return_date,
            total_rental_price: row.total_rental_price,
            late_fee: row.late_fee,
            damage_fee: row.damage_fee,
            total_amount: row.total_amount,
            payment_status: PgRentalRepository::parse_payment_status(&row.payment_status),
            notes: row.notes,
            items: Vec::new(),
            customer,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row representation of a rental item
#[derive(Debug, sqlx::FromRow)]
struct RentalItemRow {
    id: Uuid,
    rental_id: Uuid,
    toy_id: Uuid,
    toy_name: Option<String>,
    quantity: i32,
    price_per_unit: Decimal,
    condition_before: String,
    condition_after: String,
    status: String,
    damage_fee: Decimal,
    damage_description: Option<String>,
}

impl From<RentalItemRow> for RentalItem {
    fn from(row: RentalItemRow) -> Self {
        Self {
            id: row.id,
            rental_id: row.rental_id,
            toy_id: row.toy_id,
            toy_name: row.toy_name,
            quantity: row.quantity,
            price_per_unit: row.price_per_unit,
            condition_before: PgRentalRepository::parse_condition(&row.condition_before),
            condition_after: PgRentalRepository::parse_condition(&row.condition_after),
            status: PgRentalRepository::parse_item_status(&row.status),
            damage_fee: row.damage_fee,
            damage_description: row.damage_description,
        }
    }
}
