//! Business logic services for ToyRent
//!
//! This crate contains the rental lifecycle engine and the payment
//! orchestrator, plus the pure fee arithmetic both rely on.
//!
//! # Architecture
//!
//! Services are designed to be composable and testable:
//! - Each service owns its dependencies as trait objects (repositories, gateway)
//! - Services are wrapped in Arc for safe sharing across actix workers
//! - All operations are instrumented with tracing
//! - Comprehensive error handling with AppError
//!
//! # Services
//!
//! - `RentalService` - Create, extend, return and cancel rentals
//! - `PaymentService` - Gateway payments and callback reconciliation
//! - `fee_calculator` - Rental, late, damage and extension pricing

pub mod fee_calculator;
pub mod payment_orchestrator;
pub mod rental_engine;

pub use payment_orchestrator::{CallbackAction, CallbackOutcome, PaymentConfig, PaymentService};
pub use rental_engine::{
    CreateRental, ExtendRental, ExtensionOutcome, NewRentalItem, RentalService, ReturnItem,
    ReturnRental,
};

/// Business logic constants
pub mod constants {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Late fees accrue in blocks of this many hours
    pub const LATE_BLOCK_HOURS: i64 = 48;

    /// Share of the replacement price charged for a damaged toy
    pub const DAMAGED_RATE: Decimal = dec!(0.7);

    /// Share of the replacement price charged per grade of wear
    pub const WEAR_RATE_PER_GRADE: Decimal = dec!(0.15);

    /// Seconds in a rental day
    pub const SECONDS_PER_DAY: i64 = 86_400;

    /// Hours in an extension day
    pub const HOURS_PER_DAY: i64 = 24;
}
