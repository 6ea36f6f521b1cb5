//! Inventory repository implementation
//!
//! Toy lookups and stock deltas. Stock is only ever changed through a single
//! conditional `UPDATE`, so two rentals racing for the last unit cannot both
//! succeed. The connection-scoped helpers let the rental repository run the
//! same statements inside its own transactions.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use toyrent_core::{models::Toy, traits::InventoryAccessor, AppError, AppResult};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

/// PostgreSQL implementation of InventoryAccessor
pub struct PgInventoryRepository {
    pool: PgPool,
}

impl PgInventoryRepository {
    /// Create a new inventory repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn ensure_positive(toy_id: Uuid, quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::Validation(format!(
            "Quantity for toy {} must be positive, got {}",
            toy_id, quantity
        )));
    }
    Ok(())
}

/// Load a toy using an existing connection or transaction
pub async fn fetch_toy(conn: &mut PgConnection, toy_id: Uuid) -> AppResult<Option<Toy>> {
    let row = sqlx::query_as::<sqlx::Postgres, ToyRow>(
        r#"
        SELECT id, name, rental_price, late_fee_per_day, replacement_price, stock, is_available
        FROM toys
        WHERE id = $1
        "#,
    )
    .bind(toy_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| {
        error!("Database error finding toy {}: {}", toy_id, e);
        AppError::Database(format!("Failed to find toy: {}", e))
    })?;

    Ok(row.map(Into::into))
}

/// Decrement stock inside the caller's transaction
///
/// Fails with `InsufficientStock` when fewer than `quantity` units remain at
/// the moment the statement runs.
pub async fn reserve_stock(conn: &mut PgConnection, toy_id: Uuid, quantity: i32) -> AppResult<()> {
    ensure_positive(toy_id, quantity)?;

    let result = sqlx::query(
        r#"
        UPDATE toys
        SET stock = stock - $2,
            updated_at = NOW()
        WHERE id = $1 AND stock >= $2
        "#,
    )
    .bind(toy_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        error!("Database error reserving stock for toy {}: {}", toy_id, e);
        AppError::Database(format!("Failed to reserve stock: {}", e))
    })?;

    if result.rows_affected() == 0 {
        return match fetch_toy(conn, toy_id).await? {
            Some(toy) => {
                warn!(
                    toy_id = %toy_id,
                    requested = quantity,
                    available = toy.stock,
                    "Insufficient stock"
                );
                Err(AppError::InsufficientStock {
                    toy: toy.name,
                    requested: quantity,
                    available: toy.stock,
                })
            }
            None => Err(AppError::ToyNotFound(toy_id.to_string())),
        };
    }

    debug!("Reserved {} units of toy {}", quantity, toy_id);
    Ok(())
}

/// Increment stock inside the caller's transaction
pub async fn release_stock(conn: &mut PgConnection, toy_id: Uuid, quantity: i32) -> AppResult<()> {
    ensure_positive(toy_id, quantity)?;

    let result = sqlx::query(
        r#"
        UPDATE toys
        SET stock = stock + $2,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(toy_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        error!("Database error releasing stock for toy {}: {}", toy_id, e);
        AppError::Database(format!("Failed to release stock: {}", e))
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::ToyNotFound(toy_id.to_string()));
    }

    debug!("Released {} units of toy {}", quantity, toy_id);
    Ok(())
}

#[async_trait]
impl InventoryAccessor for PgInventoryRepository {
    #[instrument(skip(self))]
    async fn find_toy(&self, toy_id: Uuid) -> AppResult<Option<Toy>> {
        debug!("Finding toy by id: {}", toy_id);

        let mut conn = self.pool.acquire().await?;
        fetch_toy(&mut conn, toy_id).await
    }

    #[instrument(skip(self))]
    async fn reserve(&self, toy_id: Uuid, quantity: i32) -> AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        reserve_stock(&mut conn, toy_id, quantity).await
    }

    #[instrument(skip(self))]
    async fn release(&self, toy_id: Uuid, quantity: i32) -> AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        release_stock(&mut conn, toy_id, quantity).await
    }
}

/// Database row representation of a toy
#[derive(Debug, sqlx::FromRow)]
struct ToyRow {
    id: Uuid,
    name: String,
    rental_price: Decimal,
    late_fee_per_day: Decimal,
    replacement_price: Decimal,
    stock: i32,
    is_available: bool,
}

impl From<ToyRow> for Toy {
    fn from(row: ToyRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            rental_price: row.rental_price,
            late_fee_per_day: row.late_fee_per_day,
            replacement_price: row.replacement_price,
            stock: row.stock,
            is_available: row.is_available,
        }
    }
}
