//! Data Transfer Objects (DTOs) for API requests and responses

pub mod common;
pub mod payment;
pub mod rental;

pub use common::*;
pub use payment::*;
pub use rental::*;
