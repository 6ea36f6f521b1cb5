//! Payment DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use toyrent_core::models::Payment;
use toyrent_services::{CallbackAction, CallbackOutcome};
use uuid::Uuid;

/// Payment creation request
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    pub rental_id: Uuid,
}

/// Payment response
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub rental_id: Uuid,
    pub payment_type: String,
    pub gross_amount: Decimal,
    pub order_id: String,
    pub snap_token: Option<String>,
    pub snap_url: Option<String>,
    pub expiry_time: Option<DateTime<Utc>>,
    pub transaction_status: String,
    pub transaction_time: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub va_number: Option<String>,
    pub fraud_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            rental_id: payment.rental_id,
            payment_type: payment.payment_type.to_string(),
            gross_amount: payment.gross_amount,
            order_id: payment.order_id,
            snap_token: payment.snap_token,
            snap_url: payment.snap_url,
            expiry_time: payment.expiry_time,
            transaction_status: payment.transaction_status.to_string(),
            transaction_time: payment.transaction_time,
            payment_method: payment.payment_method,
            va_number: payment.va_number,
            fraud_status: payment.fraud_status,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}

/// Result of a processed gateway notification
#[derive(Debug, Clone, Serialize)]
pub struct CallbackResponse {
    pub order_id: String,
    pub transaction_status: String,
    #[serde(flatten)]
    pub action: CallbackAction,
}

impl From<CallbackOutcome> for CallbackResponse {
    fn from(outcome: CallbackOutcome) -> Self {
        Self {
            order_id: outcome.payment.order_id,
            transaction_status: outcome.payment.transaction_status.to_string(),
            action: outcome.action,
        }
    }
}
