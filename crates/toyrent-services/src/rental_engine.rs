//! Rental lifecycle engine
//!
//! Drives a rental from creation to return:
//! - Create rentals, reserving stock for every item
//! - Extend active, paid rentals and charge for the extra days
//! - Process returns with late and damage fees
//! - Cancel rentals that never completed

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use toyrent_core::{
    config::RentalConfig,
    models::{
        ExtensionMetadata, ItemCondition, ItemReturn, Payment, PaymentStatus, Rental, RentalItem,
        RentalItemStatus, RentalStatus, Toy,
    },
    traits::{InventoryAccessor, RentalRepository},
    AppError, AppResult,
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::fee_calculator::{
    damage_fee, extension_cost, extension_days, item_base_cost, late_days, late_fee, rental_days,
    PricedLine,
};
use crate::payment_orchestrator::PaymentService;

/// One requested toy line of a new rental
#[derive(Debug, Clone)]
pub struct NewRentalItem {
    pub toy_id: Uuid,
    pub quantity: i32,
    pub condition_before: String,
}

/// Request to create a rental
#[derive(Debug, Clone)]
pub struct CreateRental {
    pub user_id: Uuid,
    pub rental_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub items: Vec<NewRentalItem>,
}

/// Request to extend a rental
#[derive(Debug, Clone)]
pub struct ExtendRental {
    pub new_expected_return_date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Condition report for one returned item
#[derive(Debug, Clone)]
pub struct ReturnItem {
    pub rental_item_id: Uuid,
    pub condition_after: String,
    pub damage_description: Option<String>,
}

/// Request to return a rental
#[derive(Debug, Clone)]
pub struct ReturnRental {
    pub actual_return_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub items: Vec<ReturnItem>,
}

/// An applied extension and the payment that pays for it
#[derive(Debug, Clone)]
pub struct ExtensionOutcome {
    pub rental: Rental,
    pub payment: Payment,
}

fn parse_condition(raw: &str) -> AppResult<ItemCondition> {
    ItemCondition::from_str(raw)
        .ok_or_else(|| AppError::InvalidCondition(format!("Unknown condition: {}", raw)))
}

/// Rental lifecycle engine
pub struct RentalService {
    rentals: Arc<dyn RentalRepository>,
    inventory: Arc<dyn InventoryAccessor>,
    payments: Arc<PaymentService>,
    config: RentalConfig,
}

impl RentalService {
    /// Create a new rental service
    pub fn new(
        rentals: Arc<dyn RentalRepository>,
        inventory: Arc<dyn InventoryAccessor>,
        payments: Arc<PaymentService>,
        config: RentalConfig,
    ) -> Self {
        Self {
            rentals,
            inventory,
            payments,
            config,
        }
    }

    async fn load_rental(&self, id: Uuid) -> AppResult<Rental> {
        self.rentals
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::RentalNotFound(id.to_string()))
    }

    async fn load_toy(&self, toy_id: Uuid) -> AppResult<Toy> {
        self.inventory
            .find_toy(toy_id)
            .await?
            .ok_or_else(|| AppError::ToyNotFound(toy_id.to_string()))
    }

    /// Current toy records for every item of a rental, keyed by toy ID
    async fn toys_for(&self, items: &[RentalItem]) -> AppResult<HashMap<Uuid, Toy>> {
        let mut toys = HashMap::new();
        for item in items {
            if !toys.contains_key(&item.toy_id) {
                toys.insert(item.toy_id, self.load_toy(item.toy_id).await?);
            }
        }
        Ok(toys)
    }

    /// Get rental by ID, including items
    #[instrument(skip(self))]
    pub async fn get_rental(&self, id: Uuid) -> AppResult<Rental> {
        self.load_rental(id).await
    }

    /// Create a rental and reserve stock for all its items
    ///
    /// Nothing is written unless every item passes validation; the rental,
    /// its items and the stock decrements commit together.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No items, or an item has a non-positive quantity
    /// - The expected return is not after the rental date
    /// - A toy doesn't exist or has too little stock
    #[instrument(skip(self, request), fields(user_id = %request.user_id, items = request.items.len()))]
    pub async fn create_rental(&self, request: CreateRental) -> AppResult<Rental> {
        if request.items.is_empty() {
            return Err(AppError::Validation(
                "A rental needs at least one item".to_string(),
            ));
        }
        if let Some(item) = request.items.iter().find(|item| item.quantity <= 0) {
            return Err(AppError::Validation(format!(
                "Quantity for toy {} must be positive, got {}",
                item.toy_id, item.quantity
            )));
        }

        let days = rental_days(request.rental_date, request.expected_return_date)?;

        let mut rental = Rental::new(
            request.user_id,
            request.rental_date,
            request.expected_return_date,
            request.notes,
        );

        let mut requested: HashMap<Uuid, i32> = HashMap::new();
        for line in &request.items {
            let condition_before = parse_condition(&line.condition_before)?;
            let toy = self.load_toy(line.toy_id).await?;
            if !toy.is_available {
                return Err(AppError::InvalidState(format!(
                    "Toy {} is not available for rent",
                    toy.name
                )));
            }

            let total_requested = requested.entry(toy.id).or_default();
            *total_requested += line.quantity;
            if !toy.has_stock(*total_requested) {
                return Err(AppError::InsufficientStock {
                    toy: toy.name,
                    requested: *total_requested,
                    available: toy.stock,
                });
            }

            let cost = item_base_cost(line.quantity, toy.rental_price, days);
            rental.total_rental_price += cost;

            let mut item = RentalItem::new(
                rental.id,
                toy.id,
                line.quantity,
                toy.rental_price,
                condition_before,
            );
            item.toy_name = Some(toy.name);
            rental.items.push(item);
        }

        debug!(
            "Rental {} spans {} days, total {}",
            rental.id, days, rental.total_rental_price
        );

        let created = self.rentals.create_with_items(&rental).await?;

        info!(
            "Created rental {} for user {} with {} items",
            created.id,
            created.user_id,
            created.items.len()
        );
        Ok(created)
    }

    /// Move the expected return date of an active, paid rental
    ///
    /// The new date and price are stored first, then an extension payment is
    /// opened. If the payment cannot be created the extension is undone and
    /// the payment error is returned.
    #[instrument(skip(self, request))]
    pub async fn extend_rental(&self, id: Uuid, request: ExtendRental) -> AppResult<ExtensionOutcome> {
        let rental = self.load_rental(id).await?;

        if rental.status != RentalStatus::Active {
            return Err(AppError::InvalidState(format!(
                "Only active rentals can be extended, rental {} is {}",
                id, rental.status
            )));
        }
        if rental.payment_status != PaymentStatus::Paid {
            return Err(AppError::InvalidState(format!(
                "Rental {} must be paid before extending, payment is {}",
                id, rental.payment_status
            )));
        }

        let old_date = rental.expected_return_date;
        let new_date = request.new_expected_return_date;
        if new_date <= old_date {
            return Err(AppError::InvalidExtension(format!(
                "New return date {} must be after {}",
                new_date, old_date
            )));
        }

        let days = extension_days(old_date, new_date)?;
        let toys = self.toys_for(&rental.items).await?;
        let lines: Vec<PricedLine> = rental
            .items
            .iter()
            .filter_map(|item| {
                toys.get(&item.toy_id)
                    .map(|toy| PricedLine::new(toy.rental_price, item.quantity))
            })
            .collect();
        let additional_cost = extension_cost(&lines, days);

        let mut noted = rental.clone();
        match request.notes.as_deref().filter(|notes| !notes.trim().is_empty()) {
            Some(notes) => noted.append_note(&format!("Extension: {}", notes)),
            None => noted.append_note(&format!(
                "Extended from {} to {}",
                old_date.format("%Y-%m-%d"),
                new_date.format("%Y-%m-%d")
            )),
        }

        let metadata = ExtensionMetadata {
            old_expected_return_date: old_date,
            new_expected_return_date: new_date,
            additional_days: days,
            original_rental_price: rental.total_rental_price,
            additional_cost,
        };

        let extended = self
            .rentals
            .apply_extension(id, new_date, additional_cost, noted.notes)
            .await?;

        info!(
            "Extended rental {} by {} days for {}",
            id, days, additional_cost
        );

        match self.payments.create_for_extension(id, metadata.clone()).await {
            Ok(payment) => Ok(ExtensionOutcome {
                rental: extended,
                payment,
            }),
            Err(payment_error) => {
                warn!(
                    "Extension payment for rental {} failed, rolling back: {}",
                    id, payment_error
                );
                if let Err(rollback_error) = self
                    .rentals
                    .rollback_extension(
                        id,
                        metadata.old_expected_return_date,
                        metadata.original_rental_price,
                    )
                    .await
                {
                    error!(
                        "Failed to roll back extension of rental {}: {}",
                        id, rollback_error
                    );
                }
                Err(payment_error)
            }
        }
    }

    /// Process the return of every item of a rental
    ///
    /// All input is validated before anything is written. With
    /// `atomic_return` off each item commits on its own, followed by the
    /// rental update; with it on the whole return is one transaction.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The rental doesn't exist, is finalized or was already returned
    /// - The return date is before the rental date
    /// - An item is missing, listed twice, unknown or has an unknown condition
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn return_rental(&self, id: Uuid, request: ReturnRental) -> AppResult<Rental> {
        let rental = self.load_rental(id).await?;

        if rental.status.is_terminal() || rental.actual_return_date.is_some() {
            return Err(AppError::AlreadyFinalized(format!(
                "Rental {} is {} and cannot be returned again",
                id, rental.status
            )));
        }
        if request.actual_return_date < rental.rental_date {
            return Err(AppError::InvalidDate(format!(
                "Return date {} is before rental date {}",
                request.actual_return_date, rental.rental_date
            )));
        }

        let mut reports: HashMap<Uuid, (ItemCondition, Option<String>)> = HashMap::new();
        for entry in &request.items {
            if rental.find_item(entry.rental_item_id).is_none() {
                return Err(AppError::RentalItemNotFound(
                    entry.rental_item_id.to_string(),
                ));
            }
            let condition = parse_condition(&entry.condition_after)?;
            if reports
                .insert(
                    entry.rental_item_id,
                    (condition, entry.damage_description.clone()),
                )
                .is_some()
            {
                return Err(AppError::InvalidCondition(format!(
                    "Item {} is reported more than once",
                    entry.rental_item_id
                )));
            }
        }

        let reported: HashSet<Uuid> = reports.keys().copied().collect();
        if let Some(missing) = rental.items.iter().find(|item| !reported.contains(&item.id)) {
            return Err(AppError::InvalidCondition(format!(
                "Missing return condition for item {}",
                missing.id
            )));
        }

        let toys = self.toys_for(&rental.items).await?;
        let late = late_days(rental.expected_return_date, request.actual_return_date);

        let mut item_returns = Vec::with_capacity(rental.items.len());
        let mut late_lines = Vec::with_capacity(rental.items.len());
        let mut total_damage = Decimal::ZERO;

        for item in &rental.items {
            let toy = toys
                .get(&item.toy_id)
                .ok_or_else(|| AppError::ToyNotFound(item.toy_id.to_string()))?;
            let (condition_after, description) = reports
                .remove(&item.id)
                .ok_or_else(|| AppError::InvalidCondition(item.id.to_string()))?;
            late_lines.push(PricedLine::new(toy.late_fee_per_day, item.quantity));

            // Committed by an earlier per-item return that did not finish
            if item.status != RentalItemStatus::Rented {
                total_damage += item.damage_fee;
                continue;
            }

            let fee = damage_fee(
                item.condition_before,
                condition_after,
                toy.replacement_price,
                item.quantity,
            );
            total_damage += fee;

            item_returns.push(ItemReturn {
                item_id: item.id,
                toy_id: item.toy_id,
                quantity: item.quantity,
                condition_after,
                status: RentalItemStatus::for_returned_condition(condition_after),
                damage_fee: fee,
                damage_description: description,
            });
        }

        let (status, total_late) = match late {
            Some(days) => (RentalStatus::Overdue, late_fee(&late_lines, days)),
            None => (RentalStatus::Completed, Decimal::ZERO),
        };
        if !rental.status.can_transition_to(status) {
            return Err(AppError::InvalidState(format!(
                "Rental {} cannot move from {} to {}",
                id, rental.status, status
            )));
        }

        let mut returned = rental.clone();
        returned.status = status;
        returned.actual_return_date = Some(request.actual_return_date);
        returned.late_fee = total_late;
        returned.damage_fee = total_damage;
        returned.total_amount = returned.total_rental_price + total_late + total_damage;
        if let Some(notes) = request.notes.filter(|notes| !notes.trim().is_empty()) {
            returned.notes = Some(notes);
        }

        info!(
            "Returning rental {} as {}: late fee {}, damage fee {}",
            id, status, total_late, total_damage
        );

        if self.config.atomic_return {
            return self.rentals.return_atomically(&returned, &item_returns).await;
        }

        for item_return in &item_returns {
            self.rentals.return_item(id, item_return).await.map_err(|e| {
                error!(
                    "Return of rental {} stopped at item {}: {}",
                    id, item_return.item_id, e
                );
                e
            })?;
        }
        self.rentals.record_return(&returned).await
    }

    /// Cancel a rental that has not been paid or finalized
    ///
    /// Stock of every item still rented goes back on the shelf.
    #[instrument(skip(self))]
    pub async fn cancel_rental(&self, id: Uuid) -> AppResult<Rental> {
        let rental = self.load_rental(id).await?;

        if rental.status.is_terminal() || rental.actual_return_date.is_some() {
            return Err(AppError::AlreadyFinalized(format!(
                "Rental {} is already {}",
                id, rental.status
            )));
        }
        if rental.payment_status == PaymentStatus::Paid {
            return Err(AppError::InvalidState(format!(
                "Rental {} is paid and must be returned instead of cancelled",
                id
            )));
        }

        let cancelled = self.rentals.cancel(id).await?;
        info!("Cancelled rental {}", id);
        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_condition() {
        assert_eq!(parse_condition("poor").unwrap(), ItemCondition::Poor);
        assert!(matches!(
            parse_condition("scratched"),
            Err(AppError::InvalidCondition(_))
        ));
    }
}
