//! Service wiring over the in-memory store for handler tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use toyrent_api::AppState;
use toyrent_core::{
    config::RentalConfig,
    models::{
        Customer, GatewayTransaction, GatewayTransactionRequest, GatewayTransactionStatus, Toy,
        TransactionStatus,
    },
    traits::PaymentGateway,
    AppError, AppResult,
};
use toyrent_db::InMemoryStore;
use toyrent_services::{PaymentConfig, PaymentService, RentalService};
use uuid::Uuid;

/// Gateway double that issues tokens and reports preset statuses
#[derive(Default)]
pub struct StubGateway {
    statuses: Mutex<HashMap<String, TransactionStatus>>,
}

impl StubGateway {
    pub fn set_status(&self, order_id: &str, status: TransactionStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(order_id.to_string(), status);
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_transaction(
        &self,
        request: &GatewayTransactionRequest,
    ) -> AppResult<GatewayTransaction> {
        Ok(GatewayTransaction {
            token: format!("token-{}", request.order_id),
            redirect_url: format!("https://checkout.test/{}", request.order_id),
        })
    }

    async fn check_transaction_status(&self, order_id: &str) -> AppResult<GatewayTransactionStatus> {
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
            payment_method: Some("qris".to_string()),
            transaction_time: Some(Utc::now()),
            fraud_status: None,
            va_number: None,
        })
    }
}

pub struct TestContext {
    pub store: InMemoryStore,
    pub gateway: Arc<StubGateway>,
    pub state: AppState,
    pub user_id: Uuid,
    pub toy_id: Uuid,
}

/// Store seeded with one customer and one toy (5000 per day, 3 in stock)
pub async fn context() -> TestContext {
    let store = InMemoryStore::new();
    let gateway = Arc::new(StubGateway::default());

    let user_id = Uuid::new_v4();
    store
        .add_customer(
            user_id,
            Customer {
                full_name: "Dewi Lestari".to_string(),
                email: "dewi@example.com".to_string(),
                phone: None,
            },
        )
        .await;

    let toy_id = Uuid::new_v4();
    store
        .add_toy(Toy {
            id: toy_id,
            name: "Wooden train".to_string(),
            rental_price: Decimal::from(5000),
            late_fee_per_day: Decimal::from(1000),
            replacement_price: Decimal::from(200000),
            stock: 3,
            is_available: true,
        })
        .await;

    let payments = Arc::new(PaymentService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        gateway.clone(),
        PaymentConfig::default(),
    ));
    let rentals = Arc::new(RentalService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        payments.clone(),
        RentalConfig::default(),
    ));

    TestContext {
        store,
        gateway,
        state: AppState::new(rentals, payments),
        user_id,
        toy_id,
    }
}

/// Parse a decimal serialized as a JSON string
pub fn decimal(value: &serde_json::Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}
