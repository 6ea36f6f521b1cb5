//! ToyRent Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the ToyRent backend. It includes:
//!
//! - Domain models (Toy, Rental, RentalItem, Payment)
//! - Narrow repository and gateway traits used by the services
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use error::{AppError, ErrorKind};

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
