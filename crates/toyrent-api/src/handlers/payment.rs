//! Payment handlers
//!
//! Checkout creation, payment queries and the gateway notification endpoint.

use crate::dto::payment::{CallbackResponse, CreatePaymentRequest, PaymentResponse};
use crate::dto::ApiResponse;
use crate::AppState;
use actix_web::{web, HttpResponse};
use serde_json::Value;
use toyrent_core::AppError;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Create a payment for a rental's outstanding amount
///
/// POST /api/v1/payments
#[instrument(skip(state, req), fields(rental_id = %req.rental_id))]
pub async fn create_payment(
    state: web::Data<AppState>,
    req: web::Json<CreatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let payment = state.payments.create_for_rental(req.rental_id).await?;

    info!(order_id = %payment.order_id, "Payment created");

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        PaymentResponse::from(payment),
        "Payment created successfully",
    )))
}

/// Get a payment by ID
///
/// GET /api/v1/payments/{id}
#[instrument(skip(state))]
pub async fn get_payment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let payment = state.payments.get_payment(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(PaymentResponse::from(payment))))
}

/// List the payments of a rental, oldest first
///
/// GET /api/v1/payments/rental/{rental_id}
#[instrument(skip(state))]
pub async fn list_rental_payments(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let payments = state.payments.list_for_rental(path.into_inner()).await?;
    let data: Vec<PaymentResponse> = payments.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// Gateway notification endpoint
///
/// POST /api/v1/payments/callback
///
/// The body is passed through untouched; only its order id is trusted, and
/// only as a key for the status lookup.
#[instrument(skip(state, body))]
pub async fn payment_callback(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let outcome = state.payments.process_callback(&body).await.map_err(|e| {
        warn!("Payment callback rejected: {}", e);
        e
    })?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        CallbackResponse::from(outcome),
        "Callback processed",
    )))
}

/// Configure payment routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("", web::post().to(create_payment))
            .route("/callback", web::post().to(payment_callback))
            .route("/rental/{rental_id}", web::get().to(list_rental_payments))
            .route("/{id}", web::get().to(get_payment)),
    );
}
