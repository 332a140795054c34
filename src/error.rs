//! Error types for secure-crud.
//!
//! Every failure a request can hit is an [`AppError`]. Converting one into a
//! response always yields the JSON envelope `{"success": false, "error": ...}`,
//! with `details` added for validation failures.

use std::time::Duration;

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::types::ErrorEnvelope;
use crate::security::validation::FieldError;
use crate::store::StoreError;
use crate::upstream::UpstreamError;

/// Message returned for every server-side failure.
pub const GENERIC_FAILURE: &str = "Internal server error";

/// Main error type for request handling.
#[derive(Error, Debug)]
pub enum AppError {
    /// Client address is over the threshold of an applicable limiter class.
    #[error("{message}")]
    RateLimitExceeded {
        message: &'static str,
        retry_after: Duration,
    },

    /// One or more input constraints were violated.
    #[error("validation failed: {} error(s)", .0.len())]
    ValidationFailed(Vec<FieldError>),

    /// The requested record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The external random-user source failed or timed out.
    #[error("upstream failure: {0}")]
    Upstream(#[from] UpstreamError),

    /// The persistence collaborator failed or timed out.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// Request body exceeds the transport cap.
    #[error("request body too large")]
    PayloadTooLarge,

    /// The endpoint has been permanently removed.
    #[error("{0}")]
    Gone(&'static str),

    /// Anything uncategorized.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Persistence(_) | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Gone(_) => StatusCode::GONE,
        }
    }

    /// Build the envelope, logging and hiding detail of server-side failures.
    fn envelope(&self) -> ErrorEnvelope {
        match self {
            Self::ValidationFailed(details) => {
                ErrorEnvelope::new("Validation failed").with_details(details.clone())
            }
            Self::Upstream(e) => {
                tracing::error!(error = %e, "random-user source failed");
                ErrorEnvelope::new("Failed to fetch users from external source")
            }
            Self::Persistence(e) => {
                tracing::error!(error = %e, "persistence call failed");
                ErrorEnvelope::new(GENERIC_FAILURE)
            }
            Self::Unexpected(detail) => {
                tracing::error!(error = %detail, "unexpected failure");
                ErrorEnvelope::new(GENERIC_FAILURE)
            }
            other => ErrorEnvelope::new(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.envelope())).into_response();

        if let Self::RateLimitExceeded { retry_after, .. } = &self {
            // Round up so clients never retry inside the window.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}

/// Convenience Result type for request handling.
pub type Result<T> = std::result::Result<T, AppError>;
