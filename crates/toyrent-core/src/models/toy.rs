//! Toy model
//!
//! Read model of the inventory: prices and current stock.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Toy entity as seen by the rental engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toy {
    pub id: Uuid,
    pub name: String,

    /// Rental price per day
    pub rental_price: Decimal,

    /// Penalty per late day
    pub late_fee_per_day: Decimal,

    /// Full value charged when lost
    pub replacement_price: Decimal,

    /// Units currently on the shelf
    pub stock: i32,

    /// Withdrawn toys keep their stock but cannot be rented
    pub is_available: bool,
}

impl Toy {
    /// Check whether `quantity` units can be taken right now
    pub fn has_stock(&self, quantity: i32) -> bool {
        quantity > 0 && self.stock >= quantity
    }
}
