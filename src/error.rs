use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::catalog::CatalogError;
use crate::services::reservation::{FieldIssue, ReservationError};

/// Error surface of the HTTP layer. Storage details are logged, never sent.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Validation(Vec<FieldIssue>),
    NotFound(String),
    InsufficientAvailability { available: u32, requested: u32 },
    InvalidPromo(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Validation failed", "details": details }),
            ),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{what} not found") }),
            ),
            ApiError::InsufficientAvailability { available, requested } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Insufficient availability",
                    "available": available,
                    "requested": requested,
                }),
            ),
            ApiError::InvalidPromo(code) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid promo code", "code": code }),
            ),
            ApiError::Unavailable(msg) => {
                tracing::error!("Storage unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "error": "Temporarily unavailable, please retry", "retryable": true }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ReservationError> for ApiError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Validation(details) => ApiError::Validation(details),
            ReservationError::NotFound(missing) => ApiError::NotFound(missing.to_string()),
            ReservationError::InsufficientAvailability { available, requested } => {
                ApiError::InsufficientAvailability { available, requested }
            }
            ReservationError::InvalidPromo(code) => ApiError::InvalidPromo(code),
            err @ (ReservationError::CommitFailure(_) | ReservationError::Storage(_)) => {
                ApiError::Unavailable(err.to_string())
            }
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound => ApiError::NotFound("Experience".to_string()),
            CatalogError::Storage(e) => ApiError::Unavailable(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}
