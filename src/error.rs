//! Error types for the cache coordinator
//!
//! Provides error handling using thiserror. Cache faults never reach the
//! request-serving tier; only loader, upstream and webhook failures do.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::ratelimit::RateDecision;

// == Cache Error Enum ==
/// Reasons a write was refused by the cache.
///
/// `CacheCoordinator::set` logs these and carries on; `try_set` surfaces them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Serialized value is bigger than the configured ceiling
    #[error("Value for key '{key}' is {size} bytes, exceeding the {max} byte limit")]
    ValueTooLarge { key: String, size: usize, max: usize },

    /// Value could not be serialized for size measurement
    #[error("Value for key '{key}' is not serializable: {reason}")]
    Unserializable { key: String, reason: String },
}

// == Load Error ==
/// Failure of a fetch-or-populate call.
#[derive(Error, Debug)]
pub enum LoadError<E> {
    /// The loader failed; its error is passed through untouched
    #[error("{0}")]
    Loader(E),

    /// The loader did not finish before the deadline
    #[error("Loader timed out after {0:?}")]
    TimedOut(Duration),
}

// == Source Error ==
/// Failure reported by the upstream content source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {status} for document {id}")]
    Status { id: String, status: u16 },
}

// == Webhook Error ==
/// Reasons an inbound change event was rejected before invalidation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Webhook secret is not configured")]
    MissingSecret,

    #[error("Missing signature header")]
    MissingSignature,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

// == API Error Enum ==
/// Error type for the HTTP surface.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Resource not found upstream
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or wrong credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Client exceeded its request budget
    #[error("Too many requests")]
    RateLimited(RateDecision),

    /// Upstream content source failed
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::MalformedPayload(msg) => ApiError::InvalidRequest(msg),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<LoadError<SourceError>> for ApiError {
    fn from(err: LoadError<SourceError>) -> Self {
        match err {
            LoadError::Loader(SourceError::NotFound(id)) => ApiError::NotFound(id),
            LoadError::Loader(other) => ApiError::Upstream(other.to_string()),
            LoadError::TimedOut(after) => {
                ApiError::Upstream(format!("content source timed out after {:?}", after))
            }
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::RateLimited(decision) => {
                let body = Json(json!({
                    "error": "Too many requests, please try again later.",
                    "retry_after": decision.retry_after_secs(),
                }));
                let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                decision.apply_headers(response.headers_mut());
                return response;
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
