//! Rental and rental item models
//!
//! A rental moves along two axes at once: its lifecycle status
//! (`pending → active → {overdue, completed}`, any non-terminal state may be
//! cancelled) and its payment status (`unpaid → pending → {paid, failed, refunded}`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Rental lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    /// Created, waiting for the first payment
    #[default]
    Pending,
    /// Paid and in the renter's hands
    Active,
    /// Returned after the expected date
    Overdue,
    /// Returned on time
    Completed,
    /// Abandoned before completion
    Cancelled,
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RentalStatus::Pending => write!(f, "pending"),
            RentalStatus::Active => write!(f, "active"),
            RentalStatus::Overdue => write!(f, "overdue"),
            RentalStatus::Completed => write!(f, "completed"),
            RentalStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl RentalStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(RentalStatus::Pending),
            "active" => Some(RentalStatus::Active),
            "overdue" => Some(RentalStatus::Overdue),
            "completed" => Some(RentalStatus::Completed),
            "cancelled" => Some(RentalStatus::Cancelled),
            _ => None,
        }
    }

    /// Completed and cancelled rentals accept no further lifecycle changes
    pub fn is_terminal(&self) -> bool {
        matches!(self, RentalStatus::Completed | RentalStatus::Cancelled)
    }

    /// Check whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: RentalStatus) -> bool {
        use RentalStatus::*;

        match (self, next) {
            (from, Cancelled) => !from.is_terminal(),
            (Pending, Active) => true,
            (Pending, Overdue) | (Pending, Completed) => true,
            (Active, Overdue) | (Active, Completed) => true,
            (Overdue, Completed) => true,
            (from, to) => *from == to && !from.is_terminal(),
        }
    }
}

/// Payment status of a rental
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "unpaid"),
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl PaymentStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// Physical condition of a toy, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    New,
    Excellent,
    Good,
    Fair,
    Poor,
    Damaged,
    Lost,
}

impl fmt::Display for ItemCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ItemCondition {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "new" => Some(ItemCondition::New),
            "excellent" => Some(ItemCondition::Excellent),
            "good" => Some(ItemCondition::Good),
            "fair" => Some(ItemCondition::Fair),
            "poor" => Some(ItemCondition::Poor),
            "damaged" => Some(ItemCondition::Damaged),
            "lost" => Some(ItemCondition::Lost),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCondition::New => "new",
            ItemCondition::Excellent => "excellent",
            ItemCondition::Good => "good",
            ItemCondition::Fair => "fair",
            ItemCondition::Poor => "poor",
            ItemCondition::Damaged => "damaged",
            ItemCondition::Lost => "lost",
        }
    }

    /// Position on the 5-point wear scale; `damaged` and `lost` are off-scale
    pub fn grade(&self) -> Option<u32> {
        match self {
            ItemCondition::New => Some(5),
            ItemCondition::Excellent => Some(4),
            ItemCondition::Good => Some(3),
            ItemCondition::Fair => Some(2),
            ItemCondition::Poor => Some(1),
            ItemCondition::Damaged | ItemCondition::Lost => None,
        }
    }
}

/// Per-item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RentalItemStatus {
    #[default]
    Rented,
    Returned,
    Damaged,
    Lost,
}

impl fmt::Display for RentalItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RentalItemStatus::Rented => write!(f, "rented"),
            RentalItemStatus::Returned => write!(f, "returned"),
            RentalItemStatus::Damaged => write!(f, "damaged"),
            RentalItemStatus::Lost => write!(f, "lost"),
        }
    }
}

impl RentalItemStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rented" => Some(RentalItemStatus::Rented),
            "returned" => Some(RentalItemStatus::Returned),
            "damaged" => Some(RentalItemStatus::Damaged),
            "lost" => Some(RentalItemStatus::Lost),
            _ => None,
        }
    }

    /// Item status implied by the condition it came back in
    pub fn for_returned_condition(condition: ItemCondition) -> Self {
        match condition {
            ItemCondition::Lost => RentalItemStatus::Lost,
            ItemCondition::Damaged => RentalItemStatus::Damaged,
            _ => RentalItemStatus::Returned,
        }
    }
}

/// Contact details of the renter, forwarded to the payment gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Customer {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// One toy line within a rental
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalItem {
    pub id: Uuid,
    pub rental_id: Uuid,
    pub toy_id: Uuid,

    /// Display name, not authoritative
    pub toy_name: Option<String>,

    pub quantity: i32,

    /// Snapshot of the toy's rental price when the rental was created
    pub price_per_unit: Decimal,

    pub condition_before: ItemCondition,
    pub condition_after: ItemCondition,
    pub status: RentalItemStatus,
    pub damage_fee: Decimal,
    pub damage_description: Option<String>,
}

impl RentalItem {
    /// Create a freshly rented item; condition after mirrors condition before
    pub fn new(
        rental_id: Uuid,
        toy_id: Uuid,
        quantity: i32,
        price_per_unit: Decimal,
        condition_before: ItemCondition,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            rental_id,
            toy_id,
            toy_name: None,
            quantity,
            price_per_unit,
            condition_before,
            condition_after: condition_before,
            status: RentalItemStatus::Rented,
            damage_fee: Decimal::ZERO,
            damage_description: None,
        }
    }
}

/// Processed outcome for one item of a return, ready to persist
#[derive(Debug, Clone, PartialEq)]
pub struct ItemReturn {
    pub item_id: Uuid,
    pub toy_id: Uuid,

    /// Units handed back to stock
    pub quantity: i32,

    pub condition_after: ItemCondition,
    pub status: RentalItemStatus,
    pub damage_fee: Decimal,
    pub damage_description: Option<String>,
}

/// Rental entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rental {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: RentalStatus,
    pub rental_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub actual_return_date: Option<DateTime<Utc>>,

    /// Sum of item costs; only extensions (additively) and rollbacks change it
    pub total_rental_price: Decimal,

    pub late_fee: Decimal,
    pub damage_fee: Decimal,

    /// Set at return time to price + late fee + damage fee
    pub total_amount: Decimal,

    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub items: Vec<RentalItem>,
    pub customer: Option<Customer>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rental {
    /// Create a new pending, unpaid rental without items
    pub fn new(
        user_id: Uuid,
        rental_date: DateTime<Utc>,
        expected_return_date: DateTime<Utc>,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            status: RentalStatus::Pending,
            rental_date,
            expected_return_date,
            actual_return_date: None,
            total_rental_price: Decimal::ZERO,
            late_fee: Decimal::ZERO,
            damage_fee: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            payment_status: PaymentStatus::Unpaid,
            notes,
            items: Vec::new(),
            customer: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Amount still owed: base price plus any accrued fees
    pub fn amount_due(&self) -> Decimal {
        self.total_rental_price + self.late_fee + self.damage_fee
    }

    /// Append a line to the free-text notes
    pub fn append_note(&mut self, note: &str) {
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, note),
            _ => note.to_string(),
        });
    }

    pub fn find_item(&self, item_id: Uuid) -> Option<&RentalItem> {
        self.items.iter().find(|item| item.id == item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            RentalStatus::Pending,
            RentalStatus::Active,
            RentalStatus::Overdue,
            RentalStatus::Completed,
            RentalStatus::Cancelled,
        ] {
            assert_eq!(RentalStatus::from_str(&status.to_string()), Some(status));
        }
        assert_eq!(PaymentStatus::from_str("refunded"), Some(PaymentStatus::Refunded));
        assert_eq!(PaymentStatus::from_str("settled"), None);
    }

    #[test]
    fn test_transitions() {
        assert!(RentalStatus::Pending.can_transition_to(RentalStatus::Active));
        assert!(RentalStatus::Active.can_transition_to(RentalStatus::Overdue));
        assert!(RentalStatus::Overdue.can_transition_to(RentalStatus::Cancelled));
        assert!(!RentalStatus::Completed.can_transition_to(RentalStatus::Cancelled));
        assert!(!RentalStatus::Cancelled.can_transition_to(RentalStatus::Active));
        assert!(!RentalStatus::Active.can_transition_to(RentalStatus::Pending));
    }

    #[test]
    fn test_condition_parsing_is_exact() {
        assert_eq!(ItemCondition::from_str("good"), Some(ItemCondition::Good));
        assert_eq!(ItemCondition::from_str("Good"), None);
        assert_eq!(ItemCondition::from_str("broken"), None);
        assert_eq!(ItemCondition::Damaged.grade(), None);
        assert_eq!(ItemCondition::New.grade(), Some(5));
    }

    #[test]
    fn test_item_status_for_condition() {
        assert_eq!(
            RentalItemStatus::for_returned_condition(ItemCondition::Lost),
            RentalItemStatus::Lost
        );
        assert_eq!(
            RentalItemStatus::for_returned_condition(ItemCondition::Poor),
            RentalItemStatus::Returned
        );
    }

    #[test]
    fn test_new_item_mirrors_condition() {
        let item = RentalItem::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            2,
            dec!(10000),
            ItemCondition::Excellent,
        );
        assert_eq!(item.condition_after, ItemCondition::Excellent);
        assert_eq!(item.status, RentalItemStatus::Rented);
    }

    #[test]
    fn test_append_note() {
        let now = Utc::now();
        let mut rental = Rental::new(Uuid::new_v4(), now, now, None);
        rental.append_note("first");
        rental.append_note("second");
        assert_eq!(rental.notes.as_deref(), Some("first\nsecond"));
    }

    #[test]
    fn test_amount_due() {
        let now = Utc::now();
        let mut rental = Rental::new(Uuid::new_v4(), now, now, None);
        rental.total_rental_price = dec!(30000);
        rental.late_fee = dec!(4000);
        rental.damage_fee = dec!(1500);
        assert_eq!(rental.amount_due(), dec!(35500));
    }
}
