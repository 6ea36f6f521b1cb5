//! In-memory storage backend
//!
//! Implements the inventory, rental and payment traits over one shared map
//! set guarded by a single lock, so every trait call is atomic the same way
//! a PostgreSQL transaction is. Used by the service and handler test suites
//! and handy for local runs without a database.
//!
//! Failures can be injected per operation with [`InMemoryStore::fail_on`]
//! and [`InMemoryStore::fail_after`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use toyrent_core::{
    models::{
        Customer, GatewayTransactionStatus, ItemReturn, Payment, PaymentStatus, Rental,
        RentalItemStatus, RentalStatus, Toy,
    },
    traits::{InventoryAccessor, PaymentRepository, RentalRepository},
    AppError, AppResult,
};
use uuid::Uuid;

/// Operations that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    CreateRental,
    ReturnItem,
    RecordReturn,
    ApplyExtension,
    RollbackExtension,
    UpdatePaymentStatus,
    UpdateStatus,
    CreatePayment,
    UpdateTransaction,
}

#[derive(Default)]
struct MemoryState {
    toys: HashMap<Uuid, Toy>,
    customers: HashMap<Uuid, Customer>,
    rentals: HashMap<Uuid, Rental>,
    payments: HashMap<Uuid, Payment>,
    payment_order: Vec<Uuid>,

    /// Remaining successful calls before the operation fails once
    failpoints: HashMap<FailPoint, usize>,
}

impl MemoryState {
    fn check(&mut self, point: FailPoint) -> AppResult<()> {
        match self.failpoints.get_mut(&point) {
            Some(0) => {
                self.failpoints.remove(&point);
                Err(AppError::Database(format!("Injected failure at {:?}", point)))
            }
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn rental_mut(&mut self, id: Uuid) -> AppResult<&mut Rental> {
        self.rentals
            .get_mut(&id)
            .ok_or_else(|| AppError::RentalNotFound(id.to_string()))
    }

    /// Copy of a stored rental with display fields filled in
    fn hydrate(&self, id: Uuid) -> AppResult<Rental> {
        let mut rental = self
            .rentals
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::RentalNotFound(id.to_string()))?;

        rental.customer = self.customers.get(&rental.user_id).cloned();
        for item in &mut rental.items {
            item.toy_name = self.toys.get(&item.toy_id).map(|toy| toy.name.clone());
        }
        Ok(rental)
    }

    fn reserve(&mut self, toy_id: Uuid, quantity: i32) -> AppResult<()> {
        ensure_positive(toy_id, quantity)?;
        let toy = self
            .toys
            .get_mut(&toy_id)
            .ok_or_else(|| AppError::ToyNotFound(toy_id.to_string()))?;

        if toy.stock < quantity {
            return Err(AppError::InsufficientStock {
                toy: toy.name.clone(),
                requested: quantity,
                available: toy.stock,
            });
        }
        toy.stock -= quantity;
        Ok(())
    }

    fn release(&mut self, toy_id: Uuid, quantity: i32) -> AppResult<()> {
        ensure_positive(toy_id, quantity)?;
        let toy = self
            .toys
            .get_mut(&toy_id)
            .ok_or_else(|| AppError::ToyNotFound(toy_id.to_string()))?;
        toy.stock += quantity;
        Ok(())
    }

    fn apply_item_return(&mut self, rental_id: Uuid, item: &ItemReturn) -> AppResult<()> {
        let rental = self.rental_mut(rental_id)?;
        let stored = rental
            .items
            .iter_mut()
            .find(|candidate| candidate.id == item.item_id)
            .ok_or_else(|| AppError::RentalItemNotFound(item.item_id.to_string()))?;
        if stored.status != RentalItemStatus::Rented {
            return Ok(());
        }

        stored.condition_after = item.condition_after;
        stored.status = item.status;
        stored.damage_fee = item.damage_fee;
        stored.damage_description = item.damage_description.clone();
        rental.updated_at = Utc::now();

        self.release(item.toy_id, item.quantity)
    }

    fn apply_rental_return(&mut self, rental: &Rental) -> AppResult<()> {
        let stored = self.rental_mut(rental.id)?;
        stored.status = rental.status;
        stored.actual_return_date = rental.actual_return_date;
        stored.late_fee = rental.late_fee;
        stored.damage_fee = rental.damage_fee;
        stored.total_amount = rental.total_amount;
        stored.notes = rental.notes.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }
}

fn ensure_positive(toy_id: Uuid, quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::Validation(format!(
            "Quantity for toy {} must be positive, got {}",
            toy_id, quantity
        )));
    }
    Ok(())
}

/// In-memory implementation of every storage trait
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a toy
    pub async fn add_toy(&self, toy: Toy) {
        self.state.write().await.toys.insert(toy.id, toy);
    }

    /// Register contact details for a user
    pub async fn add_customer(&self, user_id: Uuid, customer: Customer) {
        self.state.write().await.customers.insert(user_id, customer);
    }

    /// Current stock of a toy
    pub async fn stock_of(&self, toy_id: Uuid) -> Option<i32> {
        self.state.read().await.toys.get(&toy_id).map(|toy| toy.stock)
    }

    pub async fn rental_count(&self) -> usize {
        self.state.read().await.rentals.len()
    }

    pub async fn payment_count(&self) -> usize {
        self.state.read().await.payments.len()
    }

    /// Make the next call of `point` fail
    pub async fn fail_on(&self, point: FailPoint) {
        self.fail_after(point, 0).await;
    }

    /// Let `successes` calls of `point` through, then fail the next one
    pub async fn fail_after(&self, point: FailPoint, successes: usize) {
        self.state.write().await.failpoints.insert(point, successes);
    }

    /// Disarm every injected failure
    pub async fn clear_failpoints(&self) {
        self.state.write().await.failpoints.clear();
    }
}

#[async_trait]
impl InventoryAccessor for InMemoryStore {
    async fn find_toy(&self, toy_id: Uuid) -> AppResult<Option<Toy>> {
        Ok(self.state.read().await.toys.get(&toy_id).cloned())
    }

    async fn reserve(&self, toy_id: Uuid, quantity: i32) -> AppResult<()> {
        self.state.write().await.reserve(toy_id, quantity)
    }

    async fn release(&self, toy_id: Uuid, quantity: i32) -> AppResult<()> {
        self.state.write().await.release(toy_id, quantity)
    }
}

#[async_trait]
impl RentalRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Rental>> {
        let state = self.state.read().await;
        if !state.rentals.contains_key(&id) {
            return Ok(None);
        }
        state.hydrate(id).map(Some)
    }

    async fn create_with_items(&self, rental: &Rental) -> AppResult<Rental> {
        let mut state = self.state.write().await;
        state.check(FailPoint::CreateRental)?;

        // Check every toy before touching any stock
        let mut wanted: HashMap<Uuid, i32> = HashMap::new();
        for item in &rental.items {
            ensure_positive(item.toy_id, item.quantity)?;
            *wanted.entry(item.toy_id).or_default() += item.quantity;
        }
        for (toy_id, quantity) in &wanted {
            let toy = state
                .toys
                .get(toy_id)
                .ok_or_else(|| AppError::ToyNotFound(toy_id.to_string()))?;
            if toy.stock < *quantity {
                return Err(AppError::InsufficientStock {
                    toy: toy.name.clone(),
                    requested: *quantity,
                    available: toy.stock,
                });
            }
        }

        for (toy_id, quantity) in wanted {
            state.reserve(toy_id, quantity)?;
        }
        state.rentals.insert(rental.id, rental.clone());
        state.hydrate(rental.id)
    }

    async fn return_item(&self, rental_id: Uuid, item: &ItemReturn) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::ReturnItem)?;
        state.apply_item_return(rental_id, item)
    }

    async fn record_return(&self, rental: &Rental) -> AppResult<Rental> {
        let mut state = self.state.write().await;
        state.check(FailPoint::RecordReturn)?;
        state.apply_rental_return(rental)?;
        state.hydrate(rental.id)
    }

    async fn return_atomically(&self, rental: &Rental, items: &[ItemReturn]) -> AppResult<Rental> {
        let mut state = self.state.write().await;

        let stored = state
            .rentals
            .get(&rental.id)
            .ok_or_else(|| AppError::RentalNotFound(rental.id.to_string()))?;
        for item in items {
            if stored.find_item(item.item_id).is_none() {
                return Err(AppError::RentalItemNotFound(item.item_id.to_string()));
            }
            if !state.toys.contains_key(&item.toy_id) {
                return Err(AppError::ToyNotFound(item.toy_id.to_string()));
            }
        }
        for _ in items {
            state.check(FailPoint::ReturnItem)?;
        }
        state.check(FailPoint::RecordReturn)?;

        for item in items {
            state.apply_item_return(rental.id, item)?;
        }
        state.apply_rental_return(rental)?;
        state.hydrate(rental.id)
    }

    async fn apply_extension(
        &self,
        id: Uuid,
        new_expected_return_date: DateTime<Utc>,
        additional_cost: Decimal,
        notes: Option<String>,
    ) -> AppResult<Rental> {
        let mut state = self.state.write().await;
        state.check(FailPoint::ApplyExtension)?;

        let rental = state.rental_mut(id)?;
        rental.expected_return_date = new_expected_return_date;
        rental.total_rental_price += additional_cost;
        rental.notes = notes;
        rental.updated_at = Utc::now();
        state.hydrate(id)
    }

    async fn rollback_extension(
        &self,
        id: Uuid,
        old_expected_return_date: DateTime<Utc>,
        original_rental_price: Decimal,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::RollbackExtension)?;

        let rental = state.rental_mut(id)?;
        rental.expected_return_date = old_expected_return_date;
        rental.total_rental_price = original_rental_price;
        rental.updated_at = Utc::now();
        Ok(())
    }

    async fn update_payment_status(&self, id: Uuid, status: PaymentStatus) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::UpdatePaymentStatus)?;

        let rental = state.rental_mut(id)?;
        rental.payment_status = status;
        rental.updated_at = Utc::now();
        Ok(())
    }

    async fn update_status(&self, id: Uuid, status: RentalStatus) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::UpdateStatus)?;

        let rental = state.rental_mut(id)?;
        rental.status = status;
        rental.updated_at = Utc::now();
        Ok(())
    }

    async fn cancel(&self, id: Uuid) -> AppResult<Rental> {
        let mut state = self.state.write().await;

        let rental = state.rental_mut(id)?;
        if rental.status.is_terminal() || rental.actual_return_date.is_some() {
            return Err(AppError::AlreadyFinalized(id.to_string()));
        }
        rental.status = RentalStatus::Cancelled;
        rental.updated_at = Utc::now();

        let outstanding: Vec<(Uuid, i32)> = rental
            .items
            .iter()
            .filter(|item| item.status == RentalItemStatus::Rented)
            .map(|item| (item.toy_id, item.quantity))
            .collect();

        for (toy_id, quantity) in outstanding {
            state.release(toy_id, quantity)?;
        }
        state.hydrate(id)
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn create(&self, payment: &Payment) -> AppResult<Payment> {
        let mut state = self.state.write().await;
        state.check(FailPoint::CreatePayment)?;

        if state
            .payments
            .values()
            .any(|existing| existing.order_id == payment.order_id)
        {
            return Err(AppError::Database(format!(
                "Duplicate order id: {}",
                payment.order_id
            )));
        }

        state.payments.insert(payment.id, payment.clone());
        state.payment_order.push(payment.id);
        Ok(payment.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Payment>> {
        Ok(self.state.read().await.payments.get(&id).cloned())
    }

    async fn find_by_order_id(&self, order_id: &str) -> AppResult<Option<Payment>> {
        Ok(self
            .state
            .read()
            .await
            .payments
            .values()
            .find(|payment| payment.order_id == order_id)
            .cloned())
    }

    async fn find_by_rental_id(&self, rental_id: Uuid) -> AppResult<Vec<Payment>> {
        let state = self.state.read().await;
        Ok(state
            .payment_order
            .iter()
            .filter_map(|id| state.payments.get(id))
            .filter(|payment| payment.rental_id == rental_id)
            .cloned()
            .collect())
    }

    async fn update_transaction(
        &self,
        id: Uuid,
        status: &GatewayTransactionStatus,
    ) -> AppResult<Payment> {
        let mut state = self.state.write().await;
        state.check(FailPoint::UpdateTransaction)?;

        let payment = state
            .payments
            .get_mut(&id)
            .ok_or_else(|| AppError::PaymentNotFound(id.to_string()))?;

        payment.transaction_status = status.transaction_status;
        if status.payment_method.is_some() {
            payment.payment_method = status.payment_method.clone();
        }
        if status.va_number.is_some() {
            payment.va_number = status.va_number.clone();
        }
        if status.fraud_status.is_some() {
            payment.fraud_status = status.fraud_status.clone();
        }
        if status.transaction_time.is_some() {
            payment.transaction_time = status.transaction_time;
        }
        payment.updated_at = Utc::now();
        Ok(payment.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use toyrent_core::models::{ItemCondition, RentalItem};

    fn toy(stock: i32) -> Toy {
        Toy {
            id: Uuid::new_v4(),
            name: "Puzzle".to_string(),
            rental_price: dec!(3000),
            late_fee_per_day: dec!(1000),
            replacement_price: dec!(50000),
            stock,
            is_available: true,
        }
    }

    fn rental_with(toy_id: Uuid, quantity: i32) -> Rental {
        let now = Utc::now();
        let mut rental = Rental::new(Uuid::new_v4(), now, now + Duration::days(2), None);
        rental.items.push(RentalItem::new(
            rental.id,
            toy_id,
            quantity,
            dec!(3000),
            ItemCondition::Good,
        ));
        rental
    }

    #[tokio::test]
    async fn test_reserve_and_release() {
        let store = InMemoryStore::new();
        let toy = toy(3);
        store.add_toy(toy.clone()).await;

        store.reserve(toy.id, 2).await.unwrap();
        assert_eq!(store.stock_of(toy.id).await, Some(1));

        let err = store.reserve(toy.id, 2).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { available: 1, .. }));

        store.release(toy.id, 2).await.unwrap();
        assert_eq!(store.stock_of(toy.id).await, Some(3));
    }

    #[tokio::test]
    async fn test_create_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let plenty = toy(5);
        let scarce = toy(1);
        store.add_toy(plenty.clone()).await;
        store.add_toy(scarce.clone()).await;

        let mut rental = rental_with(plenty.id, 2);
        rental.items.push(RentalItem::new(
            rental.id,
            scarce.id,
            2,
            dec!(3000),
            ItemCondition::New,
        ));

        let err = store.create_with_items(&rental).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { .. }));
        assert_eq!(store.stock_of(plenty.id).await, Some(5));
        assert_eq!(store.stock_of(scarce.id).await, Some(1));
        assert_eq!(store.rental_count().await, 0);
    }

    #[tokio::test]
    async fn test_failpoint_fires_once() {
        let store = InMemoryStore::new();
        let toy = toy(2);
        store.add_toy(toy.clone()).await;
        let rental = store.create_with_items(&rental_with(toy.id, 1)).await.unwrap();

        store.fail_on(FailPoint::UpdateStatus).await;
        assert!(store
            .update_status(rental.id, RentalStatus::Active)
            .await
            .is_err());
        assert!(store
            .update_status(rental.id, RentalStatus::Active)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_cancel_releases_rented_items() {
        let store = InMemoryStore::new();
        let toy = toy(4);
        store.add_toy(toy.clone()).await;
        let rental = store.create_with_items(&rental_with(toy.id, 3)).await.unwrap();
        assert_eq!(store.stock_of(toy.id).await, Some(1));

        let cancelled = store.cancel(rental.id).await.unwrap();
        assert_eq!(cancelled.status, RentalStatus::Cancelled);
        assert_eq!(store.stock_of(toy.id).await, Some(4));

        let err = store.cancel(rental.id).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyFinalized(_)));
    }

    #[tokio::test]
    async fn test_item_return_releases_stock_once() {
        let store = InMemoryStore::new();
        let toy = toy(4);
        store.add_toy(toy.clone()).await;
        let rental = store.create_with_items(&rental_with(toy.id, 3)).await.unwrap();

        let item_return = ItemReturn {
            item_id: rental.items[0].id,
            toy_id: toy.id,
            quantity: 3,
            condition_after: ItemCondition::Good,
            status: RentalItemStatus::Returned,
            damage_fee: Decimal::ZERO,
            damage_description: None,
        };
        store.return_item(rental.id, &item_return).await.unwrap();
        store.return_item(rental.id, &item_return).await.unwrap();
        assert_eq!(store.stock_of(toy.id).await, Some(4));
    }
}
