//! Rental handlers
//!
//! HTTP handlers for the rental lifecycle endpoints.

use crate::dto::rental::{
    CreateRentalRequest, ExtendRentalRequest, ExtensionResponse, RentalResponse,
    ReturnRentalRequest,
};
use crate::dto::ApiResponse;
use crate::AppState;
use actix_web::{web, HttpResponse};
use toyrent_core::AppError;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Create a rental
///
/// POST /api/v1/rentals
#[instrument(skip(state, req))]
pub async fn create_rental(
    state: web::Data<AppState>,
    req: web::Json<CreateRentalRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Rental creation validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    debug!(user_id = %req.user_id, items = req.items.len(), "Creating rental");

    let rental = state.rentals.create_rental(req.into_inner().into()).await?;

    info!(id = %rental.id, "Rental created successfully");

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        RentalResponse::from(rental),
        "Rental created successfully",
    )))
}

/// Get a rental with its items
///
/// GET /api/v1/rentals/{id}
#[instrument(skip(state))]
pub async fn get_rental(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let rental = state.rentals.get_rental(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(RentalResponse::from(rental))))
}

/// Extend a rental and open the extension payment
///
/// POST /api/v1/rentals/{id}/extend
#[instrument(skip(state, req))]
pub async fn extend_rental(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<ExtendRentalRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let id = path.into_inner();
    let outcome = state.rentals.extend_rental(id, req.into_inner().into()).await?;

    info!(id = %id, payment = %outcome.payment.order_id, "Rental extended");

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        ExtensionResponse::from(outcome),
        "Rental extended, additional payment created",
    )))
}

/// Return every item of a rental
///
/// PUT /api/v1/rentals/{id}/return
#[instrument(skip(state, req))]
pub async fn return_rental(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<ReturnRentalRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Rental return validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let rental = state
        .rentals
        .return_rental(path.into_inner(), req.into_inner().into())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        RentalResponse::from(rental),
        "Rental returned",
    )))
}

/// Cancel an unpaid rental
///
/// POST /api/v1/rentals/{id}/cancel
#[instrument(skip(state))]
pub async fn cancel_rental(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let rental = state.rentals.cancel_rental(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        RentalResponse::from(rental),
        "Rental cancelled",
    )))
}

/// Configure rental routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/rentals")
            .route("", web::post().to(create_rental))
            .route("/{id}", web::get().to(get_rental))
            .route("/{id}/extend", web::post().to(extend_rental))
            .route("/{id}/return", web::put().to(return_rental))
            .route("/{id}/cancel", web::post().to(cancel_rental)),
    );
}
