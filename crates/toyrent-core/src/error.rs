//! Unified error handling for ToyRent
//!
//! This module provides a single error type that covers every failure the
//! rental engine and payment orchestrator can surface, grouped into a small
//! taxonomy and mapped to HTTP responses.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Persistence Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid rental period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid extension: {0}")]
    InvalidExtension(String),

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    // ==================== Not Found Errors ====================
    #[error("Rental not found: {0}")]
    RentalNotFound(String),

    #[error("Rental item not found: {0}")]
    RentalItemNotFound(String),

    #[error("Toy not found: {0}")]
    ToyNotFound(String),

    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    // ==================== Conflict Errors ====================
    #[error("Insufficient stock for {toy}: requested {requested}, available {available}")]
    InsufficientStock {
        toy: String,
        requested: i32,
        available: i32,
    },

    #[error("Rental already paid: {0}")]
    AlreadyPaid(String),

    #[error("Rental already finalized: {0}")]
    AlreadyFinalized(String),

    #[error("Invalid rental state: {0}")]
    InvalidState(String),

    #[error("Callback status mismatch for order {order_id}: notified {notified}, gateway reports {actual}")]
    CallbackMismatch {
        order_id: String,
        notified: String,
        actual: String,
    },

    // ==================== External Service Errors ====================
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Payment gateway timed out after {0}s")]
    GatewayTimeout(u64),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Error taxonomy shared by every `AppError` variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input
    Validation,
    /// Rental, toy, item or payment absent
    NotFound,
    /// Request conflicts with current state or stock
    Conflict,
    /// Payment gateway call failed
    ExternalService,
    /// Datastore failure
    Persistence,
    /// Anything else
    Internal,
}

impl AppError {
    /// Returns the taxonomy bucket of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_)
            | AppError::InvalidInput(_)
            | AppError::InvalidPeriod(_)
            | AppError::InvalidExtension(_)
            | AppError::InvalidCondition(_)
            | AppError::InvalidDate(_) => ErrorKind::Validation,

            AppError::RentalNotFound(_)
            | AppError::RentalItemNotFound(_)
            | AppError::ToyNotFound(_)
            | AppError::PaymentNotFound(_) => ErrorKind::NotFound,

            AppError::InsufficientStock { .. }
            | AppError::AlreadyPaid(_)
            | AppError::AlreadyFinalized(_)
            | AppError::InvalidState(_)
            | AppError::CallbackMismatch { .. } => ErrorKind::Conflict,

            AppError::Gateway(_) | AppError::GatewayTimeout(_) => ErrorKind::ExternalService,

            AppError::Database(_) | AppError::Pool(_) | AppError::Transaction(_) => {
                ErrorKind::Persistence
            }

            AppError::Internal(_) | AppError::Config(_) | AppError::Serialization(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            // 400 Bad Request
            ErrorKind::Validation => StatusCode::BAD_REQUEST,

            // 404 Not Found
            ErrorKind::NotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            ErrorKind::Conflict => StatusCode::CONFLICT,

            // 502 / 504
            ErrorKind::ExternalService => match self {
                AppError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            },

            // 500 Internal Server Error
            ErrorKind::Persistence | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::InvalidPeriod(_) => "invalid_period",
            AppError::InvalidExtension(_) => "invalid_extension",
            AppError::InvalidCondition(_) => "invalid_condition",
            AppError::InvalidDate(_) => "invalid_date",
            AppError::RentalNotFound(_) => "rental_not_found",
            AppError::RentalItemNotFound(_) => "rental_item_not_found",
            AppError::ToyNotFound(_) => "toy_not_found",
            AppError::PaymentNotFound(_) => "payment_not_found",
            AppError::InsufficientStock { .. } => "insufficient_stock",
            AppError::AlreadyPaid(_) => "already_paid",
            AppError::AlreadyFinalized(_) => "already_finalized",
            AppError::InvalidState(_) => "invalid_state",
            AppError::CallbackMismatch { .. } => "callback_mismatch",
            AppError::Gateway(_) => "gateway_error",
            AppError::GatewayTimeout(_) => "gateway_timeout",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => AppError::Pool(err.to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::InvalidCondition("broken".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::RentalNotFound("123".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InsufficientStock {
                toy: "Lego".to_string(),
                requested: 3,
                available: 1
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::GatewayTimeout(15).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::Gateway("502 from upstream".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AppError::AlreadyPaid("r-1".to_string()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            AppError::Transaction("commit".to_string()).kind(),
            ErrorKind::Persistence
        );
        assert_eq!(
            AppError::InvalidPeriod("0 days".to_string()).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::AlreadyFinalized("x".to_string()).error_code(),
            "already_finalized"
        );
        assert_eq!(
            AppError::CallbackMismatch {
                order_id: "abc".to_string(),
                notified: "settlement".to_string(),
                actual: "pending".to_string(),
            }
            .error_code(),
            "callback_mismatch"
        );
    }
}
