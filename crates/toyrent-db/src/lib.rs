//! ToyRent Database Layer
//!
//! This crate provides PostgreSQL database access and repository implementations
//! for the ToyRent backend. It includes:
//!
//! - Connection pool management and embedded migrations with sqlx
//! - Repository implementations for toys, rentals and payments
//! - Conditional stock updates shared with the rental transactions
//! - An in-memory store implementing the same traits, for tests and local runs

pub mod memory;
pub mod pool;
pub mod repositories;

pub use memory::{FailPoint, InMemoryStore};
pub use pool::{create_pool, run_migrations};
pub use repositories::*;

// Re-export commonly used types
pub use sqlx::{PgPool, Postgres, Transaction};
pub use toyrent_core::{AppError, AppResult};
