//! Repository and gateway traits
//!
//! Narrow per-entity contracts consumed by the services. Every method that
//! touches more than one row is expected to run in a single transaction.

use crate::error::AppError;
use crate::models::{
    GatewayTransaction, GatewayTransactionRequest, GatewayTransactionStatus, ItemReturn, Payment,
    PaymentStatus, Rental, RentalStatus, Toy,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Toy lookup and atomic stock deltas
#[async_trait]
pub trait InventoryAccessor: Send + Sync {
    /// Find toy by ID
    async fn find_toy(&self, toy_id: Uuid) -> Result<Option<Toy>, AppError>;

    /// Take `quantity` units off the shelf, failing if not enough remain
    async fn reserve(&self, toy_id: Uuid, quantity: i32) -> Result<(), AppError>;

    /// Put `quantity` units back on the shelf
    async fn release(&self, toy_id: Uuid, quantity: i32) -> Result<(), AppError>;
}

/// Rental repository
#[async_trait]
pub trait RentalRepository: Send + Sync {
    /// Find rental by ID, including items and customer details
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Rental>, AppError>;

    /// Insert rental and items and reserve stock for every item
    async fn create_with_items(&self, rental: &Rental) -> Result<Rental, AppError>;

    /// Persist one returned item and release its stock
    async fn return_item(&self, rental_id: Uuid, item: &ItemReturn) -> Result<(), AppError>;

    /// Persist the rental-level outcome of a return (status, dates, fees, notes)
    async fn record_return(&self, rental: &Rental) -> Result<Rental, AppError>;

    /// Persist a whole return, items and rental, in one transaction
    async fn return_atomically(
        &self,
        rental: &Rental,
        items: &[ItemReturn],
    ) -> Result<Rental, AppError>;

    /// Move the expected return date and add `additional_cost` to the price
    async fn apply_extension(
        &self,
        id: Uuid,
        new_expected_return_date: DateTime<Utc>,
        additional_cost: Decimal,
        notes: Option<String>,
    ) -> Result<Rental, AppError>;

    /// Restore the expected return date and price captured before an extension
    async fn rollback_extension(
        &self,
        id: Uuid,
        old_expected_return_date: DateTime<Utc>,
        original_rental_price: Decimal,
    ) -> Result<(), AppError>;

    /// Update payment status
    async fn update_payment_status(&self, id: Uuid, status: PaymentStatus)
        -> Result<(), AppError>;

    /// Update lifecycle status
    async fn update_status(&self, id: Uuid, status: RentalStatus) -> Result<(), AppError>;

    /// Mark cancelled and release stock of every item still rented
    async fn cancel(&self, id: Uuid) -> Result<Rental, AppError>;
}

/// Payment repository
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a new payment
    async fn create(&self, payment: &Payment) -> Result<Payment, AppError>;

    /// Find payment by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, AppError>;

    /// Find payment by gateway order ID
    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>, AppError>;

    /// All payments of a rental, oldest first
    async fn find_by_rental_id(&self, rental_id: Uuid) -> Result<Vec<Payment>, AppError>;

    /// Store the reconciled gateway fields of a payment
    async fn update_transaction(
        &self,
        id: Uuid,
        status: &GatewayTransactionStatus,
    ) -> Result<Payment, AppError>;
}

/// Hosted-checkout payment gateway
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a checkout transaction
    async fn create_transaction(
        &self,
        request: &GatewayTransactionRequest,
    ) -> Result<GatewayTransaction, AppError>;

    /// Query the authoritative status of an order
    async fn check_transaction_status(
        &self,
        order_id: &str,
    ) -> Result<GatewayTransactionStatus, AppError>;
}
