//! Payment models
//!
//! Payments are immutable history: one record per gateway transaction,
//! updated in place only by callback reconciliation.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::AppError;

/// What a payment is charging for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Rental,
    LateFee,
    DamageFee,
    Combined,
    Extension,
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentType::Rental => write!(f, "rental"),
            PaymentType::LateFee => write!(f, "late_fee"),
            PaymentType::DamageFee => write!(f, "damage_fee"),
            PaymentType::Combined => write!(f, "combined"),
            PaymentType::Extension => write!(f, "extension"),
        }
    }
}

impl PaymentType {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rental" => Some(PaymentType::Rental),
            "late_fee" => Some(PaymentType::LateFee),
            "damage_fee" => Some(PaymentType::DamageFee),
            "combined" => Some(PaymentType::Combined),
            "extension" => Some(PaymentType::Extension),
            _ => None,
        }
    }
}

/// Gateway transaction status, stored verbatim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Capture,
    Settlement,
    Deny,
    Cancel,
    Expire,
    Failure,
    Refund,
    PartialRefund,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Capture => write!(f, "capture"),
            TransactionStatus::Settlement => write!(f, "settlement"),
            TransactionStatus::Deny => write!(f, "deny"),
            TransactionStatus::Cancel => write!(f, "cancel"),
            TransactionStatus::Expire => write!(f, "expire"),
            TransactionStatus::Failure => write!(f, "failure"),
            TransactionStatus::Refund => write!(f, "refund"),
            TransactionStatus::PartialRefund => write!(f, "partial_refund"),
        }
    }
}

impl TransactionStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(TransactionStatus::Pending),
            "capture" => Some(TransactionStatus::Capture),
            "settlement" => Some(TransactionStatus::Settlement),
            "deny" => Some(TransactionStatus::Deny),
            "cancel" => Some(TransactionStatus::Cancel),
            "expire" => Some(TransactionStatus::Expire),
            "failure" => Some(TransactionStatus::Failure),
            "refund" => Some(TransactionStatus::Refund),
            "partial_refund" => Some(TransactionStatus::PartialRefund),
            _ => None,
        }
    }

    /// Money has been collected
    pub fn is_success(&self) -> bool {
        matches!(self, TransactionStatus::Capture | TransactionStatus::Settlement)
    }

    /// The transaction will never collect money
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Deny
                | TransactionStatus::Cancel
                | TransactionStatus::Expire
                | TransactionStatus::Failure
        )
    }
}

/// Snapshot taken when a rental is extended, used to undo the extension
/// if its payment fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionMetadata {
    pub old_expected_return_date: DateTime<Utc>,
    pub new_expected_return_date: DateTime<Utc>,
    pub additional_days: i64,
    pub original_rental_price: Decimal,
    pub additional_cost: Decimal,
}

/// Payment entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub rental_id: Uuid,
    pub payment_type: PaymentType,
    pub gross_amount: Decimal,

    /// Gateway order id, `{short-id}-{yyMMddHHmmss}`
    pub order_id: String,

    pub snap_token: Option<String>,
    pub snap_url: Option<String>,
    pub expiry_time: Option<DateTime<Utc>>,
    pub transaction_time: Option<DateTime<Utc>>,
    pub transaction_status: TransactionStatus,
    pub payment_method: Option<String>,
    pub va_number: Option<String>,
    pub fraud_status: Option<String>,

    /// Only set on extension payments
    pub metadata: Option<ExtensionMetadata>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Create a pending payment with a fresh id and order id
    pub fn new(rental_id: Uuid, payment_type: PaymentType, gross_amount: Decimal) -> Self {
        let now = Utc::now();
        let id = Uuid::new_v4();
        Self {
            id,
            rental_id,
            payment_type,
            gross_amount,
            order_id: Self::generate_order_id(id, now),
            snap_token: None,
            snap_url: None,
            expiry_time: None,
            transaction_time: None,
            transaction_status: TransactionStatus::Pending,
            payment_method: None,
            va_number: None,
            fraud_status: None,
            metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build the gateway order id from the first 8 characters of the
    /// payment id and a second-resolution timestamp
    pub fn generate_order_id(id: Uuid, at: DateTime<Utc>) -> String {
        let short_id: String = id.to_string().chars().take(8).collect();
        format!("{}-{}", short_id, at.format("%y%m%d%H%M%S"))
    }

    /// Attach extension rollback data; only valid on extension payments
    pub fn set_extension_metadata(&mut self, metadata: ExtensionMetadata) -> Result<(), AppError> {
        if self.payment_type != PaymentType::Extension {
            return Err(AppError::Internal(format!(
                "Payment {} of type {} cannot carry extension metadata",
                self.id, self.payment_type
            )));
        }
        self.metadata = Some(metadata);
        Ok(())
    }

    /// Extension rollback data, if this is an extension payment
    pub fn extension_metadata(&self) -> Option<&ExtensionMetadata> {
        match self.payment_type {
            PaymentType::Extension => self.metadata.as_ref(),
            _ => None,
        }
    }

    /// Set the checkout expiry relative to creation time
    pub fn with_expiry_hours(mut self, hours: i64) -> Self {
        self.expiry_time = Some(self.created_at + Duration::hours(hours));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_id_format() {
        let id = Uuid::parse_str("3f2a9c1e-0000-4000-8000-000000000000").unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(Payment::generate_order_id(id, at), "3f2a9c1e-240309140507");
    }

    #[test]
    fn test_transaction_status_groups() {
        assert!(TransactionStatus::Settlement.is_success());
        assert!(TransactionStatus::Expire.is_failure());
        assert!(!TransactionStatus::Refund.is_failure());
        assert!(!TransactionStatus::Pending.is_success());
        assert_eq!(
            TransactionStatus::from_str("partial_refund"),
            Some(TransactionStatus::PartialRefund)
        );
    }

    #[test]
    fn test_metadata_only_on_extension() {
        let now = Utc::now();
        let metadata = ExtensionMetadata {
            old_expected_return_date: now,
            new_expected_return_date: now + Duration::days(2),
            additional_days: 2,
            original_rental_price: dec!(20000),
            additional_cost: dec!(10000),
        };

        let mut rental_payment = Payment::new(Uuid::new_v4(), PaymentType::Rental, dec!(20000));
        assert!(rental_payment.set_extension_metadata(metadata.clone()).is_err());
        assert!(rental_payment.extension_metadata().is_none());

        let mut extension = Payment::new(Uuid::new_v4(), PaymentType::Extension, dec!(10000));
        extension.set_extension_metadata(metadata.clone()).unwrap();
        assert_eq!(extension.extension_metadata(), Some(&metadata));
    }

    #[test]
    fn test_metadata_json_shape() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let metadata = ExtensionMetadata {
            old_expected_return_date: now,
            new_expected_return_date: now + Duration::days(3),
            additional_days: 3,
            original_rental_price: dec!(15000),
            additional_cost: dec!(9000),
        };

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["additional_days"], 3);
        assert!(json.get("old_expected_return_date").is_some());
        assert!(json.get("original_rental_price").is_some());
    }
}
