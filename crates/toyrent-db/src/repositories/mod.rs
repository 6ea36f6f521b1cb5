//! Repository implementations
//!
//! This module contains concrete implementations of the repository traits
//! defined in toyrent-core, using sqlx for PostgreSQL access.

pub mod inventory_repo;
pub mod payment_repo;
pub mod rental_repo;

pub use inventory_repo::{release_stock, reserve_stock, PgInventoryRepository};
pub use payment_repo::PgPaymentRepository;
pub use rental_repo::PgRentalRepository;
