//! Domain models for ToyRent
//!
//! This module contains the core domain models used throughout the application.

pub mod gateway;
pub mod payment;
pub mod rental;
pub mod toy;

pub use gateway::{
    GatewayCustomer, GatewayItem, GatewayTransaction, GatewayTransactionRequest,
    GatewayTransactionStatus,
};
pub use payment::{ExtensionMetadata, Payment, PaymentType, TransactionStatus};
pub use rental::{
    Customer, ItemCondition, ItemReturn, PaymentStatus, Rental, RentalItem, RentalItemStatus,
    RentalStatus,
};
pub use toy::Toy;
