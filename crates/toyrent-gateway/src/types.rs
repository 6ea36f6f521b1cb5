//! Wire types for the gateway JSON API

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use toyrent_core::models::{
    GatewayCustomer, GatewayItem, GatewayTransactionRequest, GatewayTransactionStatus,
    TransactionStatus,
};
use tracing::warn;

use crate::client::GatewayError;

/// Gateway timestamps are local to UTC+7
const GATEWAY_UTC_OFFSET_SECS: i32 = 7 * 3600;

const GATEWAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
pub struct SnapTransactionRequest {
    pub transaction_details: TransactionDetails,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub item_details: Vec<ItemDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_details: Option<CustomerDetails>,
    pub expiry: Expiry,
}

#[derive(Debug, Serialize)]
pub struct TransactionDetails {
    pub order_id: String,
    pub gross_amount: i64,
}

#[derive(Debug, Serialize)]
pub struct ItemDetails {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Expiry {
    pub unit: &'static str,
    pub duration: i64,
}

impl Expiry {
    /// Whole days where possible, hours otherwise
    pub fn from_hours(hours: i64) -> Self {
        if hours > 0 && hours % 24 == 0 {
            Self {
                unit: "day",
                duration: hours / 24,
            }
        } else {
            Self {
                unit: "hour",
                duration: hours.max(1),
            }
        }
    }
}

/// Checkout creation response
#[derive(Debug, Deserialize)]
pub struct SnapTransactionResponse {
    pub token: Option<String>,
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub error_messages: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct VaNumber {
    pub bank: Option<String>,
    pub va_number: String,
}

/// Status API response
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub status_code: Option<String>,
    pub status_message: Option<String>,
    pub order_id: Option<String>,
    pub transaction_status: Option<String>,
    pub payment_type: Option<String>,
    pub transaction_time: Option<String>,
    pub fraud_status: Option<String>,
    #[serde(default)]
    pub va_numbers: Vec<VaNumber>,
    pub permata_va_number: Option<String>,
}

/// Amounts travel as whole currency units; fractions are truncated
pub fn whole_units(amount: Decimal) -> Result<i64, GatewayError> {
    amount
        .trunc()
        .to_i64()
        .ok_or_else(|| GatewayError::Payload(format!("Amount out of range: {}", amount)))
}

impl SnapTransactionRequest {
    pub fn from_request(request: &GatewayTransactionRequest) -> Result<Self, GatewayError> {
        let item_details = request
            .items
            .iter()
            .map(ItemDetails::from_item)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            transaction_details: TransactionDetails {
                order_id: request.order_id.clone(),
                gross_amount: whole_units(request.gross_amount)?,
            },
            item_details,
            customer_details: request.customer.as_ref().map(CustomerDetails::from_customer),
            expiry: Expiry::from_hours(request.expiry_hours),
        })
    }
}

impl ItemDetails {
    fn from_item(item: &GatewayItem) -> Result<Self, GatewayError> {
        Ok(Self {
            id: item.id.clone(),
            name: item.name.clone(),
            price: whole_units(item.price)?,
            quantity: item.quantity,
        })
    }
}

impl CustomerDetails {
    fn from_customer(customer: &GatewayCustomer) -> Self {
        Self {
            first_name: customer.first_name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
        }
    }
}

/// Parse a gateway-local timestamp into UTC
pub fn parse_transaction_time(raw: &str) -> Option<DateTime<Utc>> {
    let offset = FixedOffset::east_opt(GATEWAY_UTC_OFFSET_SECS)?;
    let naive = NaiveDateTime::parse_from_str(raw, GATEWAY_TIME_FORMAT)
        .map_err(|e| warn!("Unparseable transaction time {:?}: {}", raw, e))
        .ok()?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

impl StatusResponse {
    /// Convert into the domain status, rejecting error bodies and unknown statuses
    pub fn into_status(self, requested_order_id: &str) -> Result<GatewayTransactionStatus, GatewayError> {
        if let Some(code) = self.status_code.as_deref() {
            if !code.starts_with('2') {
                return Err(GatewayError::Rejected(format!(
                    "{}: {}",
                    code,
                    self.status_message.unwrap_or_default()
                )));
            }
        }

        let raw_status = self
            .transaction_status
            .ok_or_else(|| GatewayError::Payload("Missing transaction_status".to_string()))?;
        let transaction_status = TransactionStatus::from_str(&raw_status)
            .ok_or(GatewayError::UnknownStatus(raw_status))?;

        let va_number = self
            .va_numbers
            .into_iter()
            .next()
            .map(|va| va.va_number)
            .or(self.permata_va_number);

        Ok(GatewayTransactionStatus {
            order_id: self
                .order_id
                .unwrap_or_else(|| requested_order_id.to_string()),
            transaction_status,
            payment_method: self.payment_type,
            transaction_time: self
                .transaction_time
                .as_deref()
                .and_then(parse_transaction_time),
            fraud_status: self.fraud_status,
            va_number,
        })
    }
}
