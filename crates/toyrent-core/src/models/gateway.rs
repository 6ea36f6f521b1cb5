//! Payment gateway request and response models
//!
//! Wire-independent shapes exchanged with a `PaymentGateway`; the HTTP
//! client maps them to the gateway's JSON.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::payment::TransactionStatus;

/// One line on the hosted checkout page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayItem {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl GatewayItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal, quantity: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            quantity,
        }
    }

    /// Line subtotal
    pub fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Buyer details shown on the checkout page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GatewayCustomer {
    pub first_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Request to open a hosted checkout transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayTransactionRequest {
    pub order_id: String,
    pub gross_amount: Decimal,
    pub items: Vec<GatewayItem>,
    pub customer: Option<GatewayCustomer>,

    /// Hours the checkout stays payable
    pub expiry_hours: i64,
}

/// Issued checkout transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayTransaction {
    pub token: String,
    pub redirect_url: String,
}

/// Authoritative status of an order as reported by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayTransactionStatus {
    pub order_id: String,
    pub transaction_status: TransactionStatus,
    pub payment_method: Option<String>,
    pub transaction_time: Option<DateTime<Utc>>,
    pub fraud_status: Option<String>,
    pub va_number: Option<String>,
}
