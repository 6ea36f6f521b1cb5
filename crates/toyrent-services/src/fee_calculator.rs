//! Fee calculator
//!
//! Pure pricing arithmetic for rentals. No I/O; every input is passed in.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use toyrent_core::{
    models::{ItemCondition, PaymentType},
    AppError, AppResult,
};

use crate::constants::{
    DAMAGED_RATE, HOURS_PER_DAY, LATE_BLOCK_HOURS, SECONDS_PER_DAY, WEAR_RATE_PER_GRADE,
};

/// A per-unit amount applied to a quantity of one toy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricedLine {
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl PricedLine {
    pub fn new(unit_price: Decimal, quantity: i32) -> Self {
        Self {
            unit_price,
            quantity,
        }
    }
}

/// Billable days between pickup and expected return, rounded up
///
/// A partial day counts as a full day. Returns `InvalidPeriod` when the
/// expected return is not after the rental date.
pub fn rental_days(start: DateTime<Utc>, expected_return: DateTime<Utc>) -> AppResult<i64> {
    let seconds = (expected_return - start).num_seconds();
    if seconds <= 0 {
        return Err(AppError::InvalidPeriod(format!(
            "Expected return {} must be after rental date {}",
            expected_return, start
        )));
    }

    Ok((seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY)
}

/// Cost of one item line for the whole rental period
pub fn item_base_cost(quantity: i32, price_per_unit: Decimal, days: i64) -> Decimal {
    Decimal::from(quantity) * price_per_unit * Decimal::from(days)
}

/// Late days charged for a return, in 48-hour blocks
///
/// `None` when the toy came back on or before the expected date. Any
/// lateness counts as at least one day.
pub fn late_days(expected: DateTime<Utc>, actual: DateTime<Utc>) -> Option<i64> {
    if actual <= expected {
        return None;
    }
    let hours_late = (actual - expected).num_hours();
    Some(hours_late / LATE_BLOCK_HOURS + 1)
}

/// Total late fee over all lines, `unit_price` being the late fee per day
pub fn late_fee(lines: &[PricedLine], late_days: i64) -> Decimal {
    lines
        .iter()
        .map(|line| line.unit_price * Decimal::from(late_days) * Decimal::from(line.quantity))
        .sum()
}

/// Damage fee for one item line
///
/// Lost items cost the full replacement price and damaged items 70% of it.
/// Otherwise each grade of wear between `before` and `after` costs 15% of
/// the replacement price. A `before` condition off the wear scale counts as
/// grade 0, so it never produces a wear charge.
pub fn damage_fee(
    before: ItemCondition,
    after: ItemCondition,
    replacement_price: Decimal,
    quantity: i32,
) -> Decimal {
    let quantity = Decimal::from(quantity);

    match after {
        ItemCondition::Lost => replacement_price * quantity,
        ItemCondition::Damaged => DAMAGED_RATE * replacement_price * quantity,
        _ => {
            let before_grade = before.grade().unwrap_or(0);
            let after_grade = after.grade().unwrap_or(0);
            if after_grade < before_grade {
                WEAR_RATE_PER_GRADE
                    * replacement_price
                    * Decimal::from(before_grade - after_grade)
                    * quantity
            } else {
                Decimal::ZERO
            }
        }
    }
}

/// Whole days added by moving the expected return date, rounded down
pub fn extension_days(old: DateTime<Utc>, new: DateTime<Utc>) -> AppResult<i64> {
    let days = (new - old).num_hours() / HOURS_PER_DAY;
    if days < 1 {
        return Err(AppError::InvalidExtension(format!(
            "Extension must add at least one full day, got {} hours",
            (new - old).num_hours()
        )));
    }
    Ok(days)
}

/// Cost of an extension, `unit_price` being the toy's current daily price
pub fn extension_cost(lines: &[PricedLine], days: i64) -> Decimal {
    lines
        .iter()
        .map(|line| line.unit_price * Decimal::from(days) * Decimal::from(line.quantity))
        .sum()
}

/// Payment type implied by the fees owed on a rental
pub fn classify_payment(late_fee: Decimal, damage_fee: Decimal) -> PaymentType {
    match (late_fee > Decimal::ZERO, damage_fee > Decimal::ZERO) {
        (true, true) => PaymentType::Combined,
        (true, false) => PaymentType::LateFee,
        (false, true) => PaymentType::DamageFee,
        (false, false) => PaymentType::Rental,
    }
}
