//! Security module for secure-crud.
//!
//! This module provides the gates every request passes through
//! before persistence is touched.
//!
//! ## Features
//!
//! - **Rate Limiting**: per-address sliding windows for general, write and
//!   bulk-populate traffic
//! - **Input Validation**: identifier and comment payload checks that report
//!   every violation at once
//! - **Sanitization**: tokenizer-based markup stripping for stored text
//! - **Headers**: security response headers and a restrictive CORS policy
//!
//! ## Example
//!
//! ```rust
//! use secure_crud::security::{CommentBody, InputValidator, MarkupSanitizer};
//!
//! let validator = InputValidator::default();
//! let body = CommentBody::Text("<script>alert(1)</script>Hello".into());
//! let comment = validator.validate_comment(&body).unwrap();
//! assert_eq!(MarkupSanitizer::strip(comment.as_str()), "Hello");
//! ```

pub mod headers;
pub mod rate_limit;
pub mod sanitizer;
pub mod validation;

// Re-export commonly used types
pub use headers::{cors_layer, with_security_headers};
pub use rate_limit::{
    rate_limit_middleware, ClassLimit, Clock, LimitClass, ManualClock, RateLimitConfig,
    RateLimitPolicy, RateLimitStats, RateLimiter, SystemClock, POPULATE_CLASSES, READ_CLASSES,
    WRITE_CLASSES,
};
pub use sanitizer::MarkupSanitizer;
pub use validation::{
    CommentBody, FieldError, InputValidator, ValidComment, ValidationConfig, ValidationErrors,
};
