//! Request extractors.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
};

use super::types::BodyKind;
use crate::error::AppError;
use crate::security::validation::FieldError;

/// Raw request body plus its media type.
///
/// Decoding is deferred to the handler so that rate limiting and validation
/// decide the response, not the framework's JSON rejection. The size cap set
/// by `DefaultBodyLimit` still applies and maps to 413.
#[derive(Debug, Clone)]
pub struct RawBody {
    pub kind: BodyKind,
    pub bytes: Bytes,
}

impl<S> FromRequest<S> for RawBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let kind = BodyKind::from_headers(req.headers());

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge,
                _ => AppError::ValidationFailed(vec![FieldError::new(
                    "body",
                    "Request body could not be read",
                )]),
            })?;

        Ok(Self { kind, bytes })
    }
}
