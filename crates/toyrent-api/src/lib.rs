//! API layer for ToyRent
//!
//! HTTP handlers for rentals, payments and gateway callbacks.

#![forbid(unsafe_code)]

pub mod dto;
pub mod handlers;

use std::sync::Arc;
use toyrent_services::{PaymentService, RentalService};

pub use dto::ApiResponse;
pub use handlers::{configure, configure_payments, configure_rentals};

/// Services shared by every worker
#[derive(Clone)]
pub struct AppState {
    pub rentals: Arc<RentalService>,
    pub payments: Arc<PaymentService>,
}

impl AppState {
    pub fn new(rentals: Arc<RentalService>, payments: Arc<PaymentService>) -> Self {
        Self { rentals, payments }
    }
}
