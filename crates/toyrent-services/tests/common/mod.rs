//! Shared fixtures: scripted gateway, seeded store and service wiring

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use toyrent_core::{
    config::RentalConfig,
    models::{
        Customer, GatewayTransaction, GatewayTransactionRequest, GatewayTransactionStatus,
        PaymentStatus, Rental, RentalStatus, Toy, TransactionStatus,
    },
    traits::{PaymentGateway, RentalRepository},
    AppError, AppResult,
};
use toyrent_db::InMemoryStore;
use toyrent_services::{CreateRental, NewRentalItem, PaymentConfig, PaymentService, RentalService};
use uuid::Uuid;

/// Gateway double whose answers are set by the test
#[derive(Default)]
pub struct FakeGateway {
    statuses: Mutex<HashMap<String, TransactionStatus>>,
    requests: Mutex<Vec<GatewayTransactionRequest>>,
    fail_create: AtomicBool,
    delay: Mutex<Option<std::time::Duration>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reject the next transaction creation
    pub fn fail_next_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    /// Status the status API will report for an order
    pub fn set_status(&self, order_id: &str, status: TransactionStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(order_id.to_string(), status);
    }

    /// Make every call sleep before answering
    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Transaction requests received so far
    pub fn requests(&self) -> Vec<GatewayTransactionRequest> {
        self.requests.lock().unwrap().clone()
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_transaction(
        &self,
        request: &GatewayTransactionRequest,
    ) -> AppResult<GatewayTransaction> {
        self.pause().await;

        if self.fail_create.swap(false, Ordering::SeqCst) {
            return Err(AppError::Gateway("transaction declined".to_string()));
        }

        self.requests.lock().unwrap().push(request.clone());
        Ok(GatewayTransaction {
            token: format!("token-{}", request.order_id),
            redirect_url: format!("https://checkout.test/{}", request.order_id),
        })
    }

    async fn check_transaction_status(&self, order_id: &str) -> AppResult<GatewayTransactionStatus> {
        self.pause().await;

        let status = self
            .statuses
            .lock()
            .unwrap()
            .get(order_id)
            .copied()
            .ok_or_else(|| AppError::Gateway(format!("unknown order {}", order_id)))?;

        Ok(GatewayTransactionStatus {
            order_id: order_id.to_string(),
            transaction_status: status,
            payment_method: Some("bank_transfer".to_string()),
            transaction_time: Some(Utc::now()),
            fraud_status: Some("accept".to_string()),
            va_number: Some("8808123456".to_string()),
        })
    }
}

/// Fully wired services over one in-memory store
pub struct Harness {
    pub store: InMemoryStore,
    pub gateway: Arc<FakeGateway>,
    pub payments: Arc<PaymentService>,
    pub rentals: RentalService,
    pub user_id: Uuid,
}

pub async fn harness() -> Harness {
    harness_with(RentalConfig::default(), PaymentConfig::default()).await
}

pub async fn harness_with(rental_config: RentalConfig, payment_config: PaymentConfig) -> Harness {
    let store = InMemoryStore::new();
    let gateway = FakeGateway::new();

    let user_id = Uuid::new_v4();
    store
        .add_customer(
            user_id,
            Customer {
                full_name: "Sari Wulandari".to_string(),
                email: "sari@example.com".to_string(),
                phone: Some("+628123456789".to_string()),
            },
        )
        .await;

    let payments = Arc::new(PaymentService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        gateway.clone(),
        payment_config,
    ));
    let rentals = RentalService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        payments.clone(),
        rental_config,
    );

    Harness {
        store,
        gateway,
        payments,
        rentals,
        user_id,
    }
}

pub fn toy(
    name: &str,
    rental_price: Decimal,
    late_fee_per_day: Decimal,
    replacement_price: Decimal,
    stock: i32,
) -> Toy {
    Toy {
        id: Uuid::new_v4(),
        name: name.to_string(),
        rental_price,
        late_fee_per_day,
        replacement_price,
        stock,
        is_available: true,
    }
}

/// Fixed pickup time so day arithmetic is predictable
pub fn pickup() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
}

pub fn line(toy_id: Uuid, quantity: i32, condition: &str) -> NewRentalItem {
    NewRentalItem {
        toy_id,
        quantity,
        condition_before: condition.to_string(),
    }
}

pub fn create_request(user_id: Uuid, days: i64, items: Vec<NewRentalItem>) -> CreateRental {
    CreateRental {
        user_id,
        rental_date: pickup(),
        expected_return_date: pickup() + Duration::days(days),
        notes: None,
        items,
    }
}

/// Put a stored rental into the active, paid state an extension requires
pub async fn activate(store: &InMemoryStore, rental_id: Uuid) -> Rental {
    store
        .update_payment_status(rental_id, PaymentStatus::Paid)
        .await
        .unwrap();
    store
        .update_status(rental_id, RentalStatus::Active)
        .await
        .unwrap();
    RentalRepository::find_by_id(store, rental_id)
        .await
        .unwrap()
        .unwrap()
}

pub async fn fetch_rental(store: &InMemoryStore, rental_id: Uuid) -> Rental {
    RentalRepository::find_by_id(store, rental_id)
        .await
        .unwrap()
        .unwrap()
}
