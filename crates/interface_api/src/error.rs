//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_kernel::{CoreError, PortError};
use domain_inventory::PostingError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Option<Vec<String>>,
    },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: None,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg, None),
            ApiError::Validation { message, details } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", message, details)
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<PostingError> for ApiError {
    fn from(err: PostingError) -> Self {
        match err {
            PostingError::DocumentNotFound(_) => ApiError::NotFound(err.to_string()),
            PostingError::AlreadyPosted(_) | PostingError::ConcurrencyConflict(_) => {
                ApiError::Conflict(err.to_string())
            }
            PostingError::InsufficientStock {
                ref item_name,
                ref account,
                available,
                requested,
                ..
            } => ApiError::Validation {
                details: Some(vec![
                    format!("item: {}", item_name),
                    format!("account: {}", account),
                    format!("available: {}", available),
                    format!("requested: {}", requested),
                ]),
                message: err.to_string(),
            },
            PostingError::UnknownOperationType(_) | PostingError::InvalidDocument(_) => {
                ApiError::validation(err.to_string())
            }
            PostingError::FifoBatchesExhausted { .. } | PostingError::Arithmetic(_) => {
                error!(error = %err, "Posting hit an inconsistent ledger");
                ApiError::Internal(err.to_string())
            }
            PostingError::Store(port) => port.into(),
        }
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            PortError::Validation { .. } => ApiError::validation(err.to_string()),
            PortError::Conflict { .. } | PortError::Constraint { .. } => ApiError::Conflict(err.to_string()),
            PortError::Connection { .. } => ApiError::Unavailable(err.to_string()),
            PortError::Internal { .. } => {
                error!(error = %err, "Ledger store failure");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Configuration(_) => {
                error!(error = %err, "Server configuration rejected");
                ApiError::Internal(err.to_string())
            }
            other => ApiError::validation(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation {
            message: "Request validation failed".to_string(),
            details: Some(errors.to_string().lines().map(str::to_string).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{DocumentId, MoneyError, NomenclatureId};
    use rust_decimal_macros::dec;

    fn status_of(error: ApiError) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn test_posting_error_status_codes() {
        let id = DocumentId::new();
        assert_eq!(status_of(PostingError::DocumentNotFound(id).into()), StatusCode::NOT_FOUND);
        assert_eq!(status_of(PostingError::AlreadyPosted(id).into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(PostingError::ConcurrencyConflict("lock timeout".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(PostingError::UnknownOperationType("Count".into()).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(PostingError::Store(PortError::internal("boom")).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(PostingError::Arithmetic(MoneyError::DivisionByZero).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_insufficient_stock_carries_details() {
        let error: ApiError = PostingError::InsufficientStock {
            item: NomenclatureId::new(),
            item_name: "Cable".to_string(),
            account: "281".to_string(),
            available: dec!(15),
            requested: dec!(50),
        }
        .into();

        match error {
            ApiError::Validation { details: Some(details), .. } => {
                assert!(details.contains(&"available: 15".to_string()));
                assert!(details.contains(&"requested: 50".to_string()));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_core_error_status_codes() {
        assert_eq!(
            status_of(CoreError::validation("Document must have at least one line").into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(CoreError::configuration("Sale is both inbound and outbound").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_port_not_found_is_404() {
        let error: ApiError = PortError::not_found("Nomenclature", "x").into();
        assert_eq!(status_of(error), StatusCode::NOT_FOUND);
    }
}
