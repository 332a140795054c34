//! API layer for secure-crud.
//!
//! ## Endpoints
//!
//! | Method | Path | Limiter classes |
//! |---|---|---|
//! | `GET` | `/health` | none |
//! | `GET` | `/populate` | general, populate |
//! | `GET` | `/users` | general |
//! | `POST` | `/user` | general |
//! | `POST` | `/comment` | general, write |
//! | `GET` | `/comments` | general |
//! | `GET` | `/comments/{id}` | general |
//! | `DELETE` | `/comments/{id}` | general, write |
//! | `POST` | `/query` | general (always 410) |
//! | any other | any other | general (404 envelope) |
//!
//! Every response is a JSON envelope carrying `success`.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use secure_crud::api::{serve, AppState, ServerConfig};
//! use secure_crud::security::RateLimiter;
//! use secure_crud::upstream::RandomUserClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = RandomUserClient::new("https://randomuser.me", Duration::from_secs(10))?;
//!     let state = AppState::in_memory(Arc::new(source), Arc::new(RateLimiter::default()));
//!     serve(ServerConfig::new("127.0.0.1", 3001), state).await?;
//!     Ok(())
//! }
//! ```

pub mod extract;
pub mod handlers;
pub mod router;
pub mod types;

// Re-export commonly used types
pub use extract::RawBody;
pub use handlers::{AppState, POPULATE_COUNT};
pub use router::{create_router, create_router_with_config, serve, ServerConfig};
pub use types::{Envelope, ErrorEnvelope, HealthResponse, MessageEnvelope, UserSummary};
