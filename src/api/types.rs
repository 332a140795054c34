//! API request and response types.

use axum::http::{header::CONTENT_TYPE, HeaderMap};
use axum::body::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::security::validation::{CommentBody, FieldError};
use crate::store::{RecordId, User};

/// Successful response carrying data.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Successful response carrying only a confirmation message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageEnvelope {
    pub success: bool,
    pub message: String,
}

impl MessageEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Failure response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    /// Human-readable error message.
    pub error: String,
    /// Every violated constraint, for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<FieldError>) -> Self {
        self.details = Some(details);
        self
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub status: &'static str,
}

/// List view of a user; email and age are left out on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// Media type of a request body, reduced to what the handlers care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Text,
    Other,
}

impl BodyKind {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
            return Self::Other;
        };

        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/json" || essence.ends_with("+json") {
            Self::Json
        } else if essence.starts_with("text/") {
            Self::Text
        } else {
            Self::Other
        }
    }
}

/// Parse a JSON body; an empty body reads as `null`.
pub fn parse_json(bytes: &Bytes) -> Result<Value, FieldError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes)
        .map_err(|_| FieldError::new("body", "Request body must be valid JSON"))
}

impl CommentBody {
    /// Resolve a raw request body into one of the accepted shapes.
    pub fn resolve(kind: BodyKind, bytes: &Bytes) -> Result<Self, FieldError> {
        match kind {
            BodyKind::Text => String::from_utf8(bytes.to_vec())
                .map(CommentBody::Text)
                .map_err(|_| FieldError::new("comment", "Comment must be valid UTF-8 text")),
            BodyKind::Json => match parse_json(bytes)? {
                Value::Object(mut map) => Ok(CommentBody::Object {
                    comment: map.remove("comment"),
                }),
                _ => Ok(CommentBody::Unsupported),
            },
            BodyKind::Other => Ok(CommentBody::Unsupported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_body_kind() {
        assert_eq!(BodyKind::from_headers(&headers("application/json")), BodyKind::Json);
        assert_eq!(
            BodyKind::from_headers(&headers("Application/JSON; charset=utf-8")),
            BodyKind::Json
        );
        assert_eq!(BodyKind::from_headers(&headers("text/plain")), BodyKind::Text);
        assert_eq!(
            BodyKind::from_headers(&headers("multipart/form-data")),
            BodyKind::Other
        );
        assert_eq!(BodyKind::from_headers(&HeaderMap::new()), BodyKind::Other);
    }

    #[test]
    fn test_resolve_text() {
        let body = CommentBody::resolve(BodyKind::Text, &Bytes::from("<b>hi</b>")).unwrap();
        assert_eq!(body, CommentBody::Text("<b>hi</b>".into()));
    }

    #[test]
    fn test_resolve_object() {
        let body =
            CommentBody::resolve(BodyKind::Json, &Bytes::from(r#"{"comment":"hey"}"#)).unwrap();
        assert_eq!(
            body,
            CommentBody::Object {
                comment: Some(json!("hey"))
            }
        );
    }

    #[test]
    fn test_resolve_json_non_object() {
        let body = CommentBody::resolve(BodyKind::Json, &Bytes::from(r#""bare""#)).unwrap();
        assert_eq!(body, CommentBody::Unsupported);
    }

    #[test]
    fn test_resolve_invalid_json() {
        let err = CommentBody::resolve(BodyKind::Json, &Bytes::from("{ nope")).unwrap_err();
        assert_eq!(err.field, "body");
    }

    #[test]
    fn test_parse_json_empty_is_null() {
        assert_eq!(parse_json(&Bytes::new()).unwrap(), Value::Null);
    }

    #[test]
    fn test_error_envelope_serialization() {
        let json = serde_json::to_value(ErrorEnvelope::new("Comment not found")).unwrap();
        assert_eq!(json, json!({"success": false, "error": "Comment not found"}));
    }

    #[test]
    fn test_user_summary_omits_private_fields() {
        let summary = UserSummary::from(User {
            id: 7,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            age: 36,
        });
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json, json!({"id": 7, "firstName": "Ada", "lastName": "Lovelace"}));
    }
}
