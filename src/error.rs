//! Error handling for the application

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::inventory::DeductionError;
use crate::schedule::ScheduleError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient stock for product {product_id}")]
    InsufficientStock { product_id: uuid::Uuid },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<DeductionError> for AppError {
    fn from(err: DeductionError) -> Self {
        match err {
            DeductionError::InsufficientStock { product_id }
            | DeductionError::Contended { product_id } => {
                AppError::InsufficientStock { product_id }
            }
            DeductionError::Database(e) => AppError::Database(e),
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error_type: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", "Not found".to_string()),
            AppError::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation", msg.clone())
            }
            AppError::InsufficientStock { product_id } => {
                tracing::info!("Deduction rejected for product {}", product_id);
                (
                    StatusCode::CONFLICT,
                    "insufficient_stock",
                    "Insufficient stock, please retry with updated quantity".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database",
                    "Database error".to_string(),
                )
            }
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "config",
                    "Configuration error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error_type, message })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Validation("bad".into()).into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::InsufficientStock {
                product_id: uuid::Uuid::nil()
            }
            .into_response()
            .status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_deduction_conflict_maps_to_insufficient_stock() {
        let id = uuid::Uuid::new_v4();
        let err: AppError = DeductionError::InsufficientStock { product_id: id }.into();
        assert!(matches!(err, AppError::InsufficientStock { product_id } if product_id == id));
    }
}
