//! HTTP request handlers

pub mod payment;
pub mod rental;

use actix_web::{web, HttpResponse};
use toyrent_core::AppError;

pub use payment::configure as configure_payments;
pub use rental::configure as configure_rentals;

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "toyrent",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// JSON body extractor that reports malformed bodies as validation errors
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(256 * 1024)
        .error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}

/// Configure every API route under `/api/v1`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config()).service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(configure_rentals)
            .configure(configure_payments),
    );
}
