//! # secure-crud
//!
//! A small users/comments API that hardens every input path.
//!
//! Every request passes an ordered set of gates before storage is touched:
//! per-address rate limiting, input validation, markup sanitization, and
//! only then a single persistence call. Failures at any gate produce a JSON
//! envelope with `success: false`.
//!
//! ## Features
//!
//! - **Rate limiting**: sliding windows per client address for general,
//!   write and bulk-populate traffic
//! - **Validation**: every violated constraint is reported in one response
//! - **Sanitization**: tokenizer-based, idempotent markup stripping
//! - **Hardened responses**: security headers, restrictive CORS, body cap
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use secure_crud::{api, security::RateLimiter, upstream::RandomUserClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     secure_crud::logging::try_init("info").ok();
//!
//!     let source = RandomUserClient::new("https://randomuser.me", Duration::from_secs(10))?;
//!     let state = api::AppState::in_memory(Arc::new(source), Arc::new(RateLimiter::default()));
//!
//!     api::serve(api::ServerConfig::default(), state).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod security;
pub mod store;
pub mod upstream;

// Re-export commonly used types
pub use api::{create_router, AppState, ServerConfig};
pub use error::{AppError, Result};
pub use security::{InputValidator, MarkupSanitizer, RateLimiter};
pub use store::{Comment, CommentStore, MemoryStore, User, UserStore};
pub use upstream::{RandomUserClient, UserSource};
