//! Input validation for identifiers and comment submissions.
//!
//! Validation runs before any handler logic. Every violated constraint of a
//! request is collected so the client can fix them in one round trip.

use serde::Serialize;
use serde_json::Value;

use crate::store::RecordId;

/// Validation configuration.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Maximum comment length in characters, measured after trimming.
    pub max_comment_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_comment_length: 1000,
        }
    }
}

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the offending field as the client sent it.
    pub field: String,
    /// Human-readable reason.
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn not_positive_integer(field: &str) -> Self {
        Self::new(field, format!("{} must be a positive integer", field))
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Accumulates field errors across all checks of one request.
#[derive(Debug, Default)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    /// Record the error side of `result`, passing the value through.
    pub fn check<T>(&mut self, result: Result<T, FieldError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.push(error);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(value)` if nothing was recorded, otherwise every recorded error.
    pub fn finish<T>(self, value: Option<T>) -> Result<T, Vec<FieldError>> {
        match value {
            Some(value) if self.0.is_empty() => Ok(value),
            _ if self.0.is_empty() => Err(vec![FieldError::new("body", "Invalid request")]),
            _ => Err(self.0),
        }
    }
}

/// Shape of a comment submission, resolved once at the HTTP edge.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentBody {
    /// Plain-text body, used verbatim.
    Text(String),
    /// JSON object; `comment` holds whatever the client put there.
    Object { comment: Option<Value> },
    /// Any other shape (JSON array, number, unknown media type, ...).
    Unsupported,
}

/// A comment that passed validation: trimmed, non-empty, within length.
///
/// Still raw text; it must be sanitized before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidComment(String);

impl ValidComment {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Request input validator.
#[derive(Debug, Default)]
pub struct InputValidator {
    config: ValidationConfig,
}

impl InputValidator {
    /// Create a new validator with the given config.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate an identifier carried in a JSON body.
    ///
    /// Accepts a JSON integer or a string of ASCII digits, either way `>= 1`.
    pub fn validate_id_value(
        &self,
        field: &str,
        value: Option<&Value>,
    ) -> Result<RecordId, FieldError> {
        let id = match value {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => parse_positive(s),
            _ => None,
        };

        id.filter(|&id| id >= 1)
            .ok_or_else(|| FieldError::not_positive_integer(field))
    }

    /// Validate an identifier carried as text, e.g. a path segment.
    pub fn validate_id_str(&self, field: &str, raw: &str) -> Result<RecordId, FieldError> {
        parse_positive(raw)
            .filter(|&id| id >= 1)
            .ok_or_else(|| FieldError::not_positive_integer(field))
    }

    /// Validate a comment submission.
    ///
    /// The length ceiling applies to the trimmed input, before sanitization.
    pub fn validate_comment(&self, body: &CommentBody) -> Result<ValidComment, Vec<FieldError>> {
        let mut errors = ValidationErrors::new();

        let text = match body {
            CommentBody::Text(text) => Some(text.as_str()),
            CommentBody::Object {
                comment: Some(Value::String(text)),
            } => Some(text.as_str()),
            CommentBody::Object {
                comment: Some(Value::Null) | None,
            }
            | CommentBody::Unsupported => {
                errors.push(FieldError::new("comment", "Comment is required"));
                None
            }
            CommentBody::Object { comment: Some(_) } => {
                errors.push(FieldError::new("comment", "Comment must be a string"));
                None
            }
        };

        let comment = text.and_then(|text| errors.check(self.check_comment_text(text)));
        errors.finish(comment)
    }

    fn check_comment_text(&self, text: &str) -> Result<ValidComment, FieldError> {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Err(FieldError::new("comment", "Comment cannot be empty"));
        }

        if trimmed.chars().count() > self.config.max_comment_length {
            return Err(FieldError::new(
                "comment",
                format!(
                    "Comment must be less than {} characters",
                    self.config.max_comment_length
                ),
            ));
        }

        Ok(ValidComment(trimmed.to_string()))
    }
}

/// Parse a string that is exactly a run of ASCII digits.
fn parse_positive(raw: &str) -> Option<RecordId> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> InputValidator {
        InputValidator::default()
    }

    #[test]
    fn test_validation_config_default() {
        assert_eq!(ValidationConfig::default().max_comment_length, 1000);
    }

    #[test]
    fn test_id_accepts_positive_integers() {
        let v = validator();
        for n in [1i64, 2, 999_999, i64::MAX] {
            assert_eq!(v.validate_id_value("userId", Some(&json!(n))), Ok(n));
            assert_eq!(v.validate_id_str("id", &n.to_string()), Ok(n));
        }
    }

    #[test]
    fn test_id_accepts_numeric_string() {
        let v = validator();
        assert_eq!(v.validate_id_value("userId", Some(&json!("42"))), Ok(42));
    }

    #[test]
    fn test_id_rejects_non_positive() {
        let v = validator();
        for n in [0i64, -1, -500] {
            let err = v.validate_id_value("userId", Some(&json!(n))).unwrap_err();
            assert!(err.message.contains("positive integer"));
            assert!(v.validate_id_str("id", &n.to_string()).is_err());
        }
    }

    #[test]
    fn test_id_rejects_malformed() {
        let v = validator();
        let bad = [
            json!("abc"),
            json!(""),
            json!(" 5"),
            json!("5 "),
            json!("+5"),
            json!("1.5"),
            json!("99999999999999999999"),
            json!(1.5),
            json!(true),
            json!(null),
            json!([1]),
            json!({"id": 1}),
        ];
        for value in bad {
            let err = v.validate_id_value("userId", Some(&value)).unwrap_err();
            assert_eq!(err.field, "userId");
            assert_eq!(err.message, "userId must be a positive integer");
        }
        assert!(v.validate_id_value("userId", None).is_err());
    }

    #[test]
    fn test_comment_text_body() {
        let v = validator();
        let body = CommentBody::Text("  hello there \n".into());
        assert_eq!(v.validate_comment(&body).unwrap().as_str(), "hello there");
    }

    #[test]
    fn test_comment_object_body() {
        let v = validator();
        let body = CommentBody::Object {
            comment: Some(json!("from json")),
        };
        assert_eq!(v.validate_comment(&body).unwrap().into_inner(), "from json");
    }

    #[test]
    fn test_comment_required() {
        let v = validator();
        for body in [
            CommentBody::Object { comment: None },
            CommentBody::Object {
                comment: Some(Value::Null),
            },
            CommentBody::Unsupported,
        ] {
            let errors = v.validate_comment(&body).unwrap_err();
            assert_eq!(errors.len(), 1);
            assert!(errors[0].message.contains("required"));
        }
    }

    #[test]
    fn test_comment_wrong_type() {
        let v = validator();
        let body = CommentBody::Object {
            comment: Some(json!(12)),
        };
        let errors = v.validate_comment(&body).unwrap_err();
        assert!(errors[0].message.contains("must be a string"));
    }

    #[test]
    fn test_comment_empty_after_trim() {
        let v = validator();
        let errors = v
            .validate_comment(&CommentBody::Text(" \t\n ".into()))
            .unwrap_err();
        assert_eq!(errors[0].message, "Comment cannot be empty");
    }

    #[test]
    fn test_comment_length_boundary() {
        let v = validator();

        let exact = "a".repeat(1000);
        assert!(v.validate_comment(&CommentBody::Text(exact)).is_ok());

        let padded = format!("   {}   ", "b".repeat(1000));
        assert!(v.validate_comment(&CommentBody::Text(padded)).is_ok());

        let over = "c".repeat(1001);
        let errors = v.validate_comment(&CommentBody::Text(over)).unwrap_err();
        assert!(errors[0].message.contains("less than 1000 characters"));
    }

    #[test]
    fn test_comment_length_counts_characters() {
        let v = validator();
        let wide = "é".repeat(1000);
        assert!(v.validate_comment(&CommentBody::Text(wide)).is_ok());
    }

    #[test]
    fn test_length_checked_before_sanitization() {
        let v = validator();
        let markup = format!("<b>{}</b>", "x".repeat(995));
        assert!(v.validate_comment(&CommentBody::Text(markup)).is_err());
    }

    #[test]
    fn test_errors_accumulate() {
        let v = validator();
        let mut errors = ValidationErrors::new();
        let a = errors.check(v.validate_id_str("a", "x"));
        let b = errors.check(v.validate_id_str("b", "0"));
        assert!(a.is_none() && b.is_none());

        let result: Result<(), _> = errors.finish(None);
        let fields: Vec<_> = result.unwrap_err().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["a", "b"]);
    }

    #[test]
    fn test_field_error_display() {
        let err = FieldError::new("comment", "Comment cannot be empty");
        assert_eq!(err.to_string(), "comment: Comment cannot be empty");
    }
}
