//! Rental DTOs
//!
//! Request and response types for rental endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use toyrent_core::models::{Payment, Rental, RentalItem};
use toyrent_services::{
    CreateRental, ExtendRental, ExtensionOutcome, NewRentalItem, ReturnItem, ReturnRental,
};
use uuid::Uuid;
use validator::Validate;

use super::payment::PaymentResponse;

/// One toy line of a rental creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RentalItemRequest {
    pub toy_id: Uuid,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,

    /// Condition at pickup (new/excellent/good/fair/poor)
    #[validate(length(min = 1, message = "Condition before is required"))]
    pub condition_before: String,
}

/// Rental creation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRentalRequest {
    pub user_id: Uuid,
    pub rental_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,

    #[validate(length(min = 1, message = "At least one item is required"), nested)]
    pub items: Vec<RentalItemRequest>,
}

impl From<CreateRentalRequest> for CreateRental {
    fn from(req: CreateRentalRequest) -> Self {
        Self {
            user_id: req.user_id,
            rental_date: req.rental_date,
            expected_return_date: req.expected_return_date,
            notes: req.notes,
            items: req
                .items
                .into_iter()
                .map(|item| NewRentalItem {
                    toy_id: item.toy_id,
                    quantity: item.quantity,
                    condition_before: item.condition_before,
                })
                .collect(),
        }
    }
}

/// Rental extension request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExtendRentalRequest {
    pub new_expected_return_date: DateTime<Utc>,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl From<ExtendRentalRequest> for ExtendRental {
    fn from(req: ExtendRentalRequest) -> Self {
        Self {
            new_expected_return_date: req.new_expected_return_date,
            notes: req.notes,
        }
    }
}

/// Condition report for one returned item
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReturnItemRequest {
    pub rental_item_id: Uuid,

    #[validate(length(min = 1, message = "Condition after is required"))]
    pub condition_after: String,

    pub damage_description: Option<String>,
}

/// Rental return request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReturnRentalRequest {
    pub actual_return_date: DateTime<Utc>,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,

    #[validate(length(min = 1, message = "Every rented item must be reported"), nested)]
    pub items: Vec<ReturnItemRequest>,
}

impl From<ReturnRentalRequest> for ReturnRental {
    fn from(req: ReturnRentalRequest) -> Self {
        Self {
            actual_return_date: req.actual_return_date,
            notes: req.notes,
            items: req
                .items
                .into_iter()
                .map(|item| ReturnItem {
                    rental_item_id: item.rental_item_id,
                    condition_after: item.condition_after,
                    damage_description: item.damage_description,
                })
                .collect(),
        }
    }
}

/// Rental item response
#[derive(Debug, Clone, Serialize)]
pub struct RentalItemResponse {
    pub id: Uuid,
    pub toy_id: Uuid,
    pub toy_name: Option<String>,
    pub quantity: i32,
    pub price_per_unit: Decimal,
    pub condition_before: String,
    pub condition_after: String,
    pub status: String,
    pub damage_fee: Decimal,
    pub damage_description: Option<String>,
}

impl From<RentalItem> for RentalItemResponse {
    fn from(item: RentalItem) -> Self {
        Self {
            id: item.id,
            toy_id: item.toy_id,
            toy_name: item.toy_name,
            quantity: item.quantity,
            price_per_unit: item.price_per_unit,
            condition_before: item.condition_before.to_string(),
            condition_after: item.condition_after.to_string(),
            status: item.status.to_string(),
            damage_fee: item.damage_fee,
            damage_description: item.damage_description,
        }
    }
}

/// Rental response
#[derive(Debug, Clone, Serialize)]
pub struct RentalResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_name: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub rental_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub actual_return_date: Option<DateTime<Utc>>,
    pub total_rental_price: Decimal,
    pub late_fee: Decimal,
    pub damage_fee: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub items: Vec<RentalItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Rental> for RentalResponse {
    fn from(rental: Rental) -> Self {
        Self {
            id: rental.id,
            user_id: rental.user_id,
            customer_name: rental.customer.map(|customer| customer.full_name),
            status: rental.status.to_string(),
            payment_status: rental.payment_status.to_string(),
            rental_date: rental.rental_date,
            expected_return_date: rental.expected_return_date,
            actual_return_date: rental.actual_return_date,
            total_rental_price: rental.total_rental_price,
            late_fee: rental.late_fee,
            damage_fee: rental.damage_fee,
            total_amount: rental.total_amount,
            notes: rental.notes,
            items: rental.items.into_iter().map(Into::into).collect(),
            created_at: rental.created_at,
            updated_at: rental.updated_at,
        }
    }
}

/// Extended rental plus the payment opened for the extra days
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionResponse {
    pub rental: RentalResponse,
    pub payment: PaymentResponse,
    pub additional_cost: Decimal,
    pub original_rental_price: Decimal,
    pub new_total_price: Decimal,
}

impl From<ExtensionOutcome> for ExtensionResponse {
    fn from(outcome: ExtensionOutcome) -> Self {
        let ExtensionOutcome { rental, payment } = outcome;
        let additional_cost = payment.gross_amount;
        let original_rental_price = original_price(&rental, &payment);
        let new_total_price = rental.total_rental_price;

        Self {
            rental: rental.into(),
            payment: payment.into(),
            additional_cost,
            original_rental_price,
            new_total_price,
        }
    }
}

fn original_price(rental: &Rental, payment: &Payment) -> Decimal {
    payment
        .extension_metadata()
        .map(|metadata| metadata.original_rental_price)
        .unwrap_or(rental.total_rental_price - payment.gross_amount)
}
