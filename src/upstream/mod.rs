//! External random-user source.
//!
//! Bulk-populate pulls candidate users from an unreliable third party. The
//! handlers depend on [`UserSource`] so tests can substitute a fake.

pub mod random_user;

use async_trait::async_trait;
use thiserror::Error;

pub use random_user::RandomUserClient;

/// A user record as delivered by the external source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: u32,
}

/// Failures talking to the external source.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Network or TLS failure, including client-side timeouts.
    #[error("transport error: {0}")]
    Transport(String),

    /// The source answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The payload could not be decoded.
    #[error("invalid payload: {0}")]
    Decode(String),

    /// Fewer records came back than were requested.
    #[error("expected {expected} records, received {received}")]
    ShortResult { expected: usize, received: usize },
}

/// Source of candidate users.
#[async_trait]
pub trait UserSource: Send + Sync {
    /// Fetch exactly `count` candidate records.
    async fn fetch_users(&self, count: usize) -> Result<Vec<CandidateUser>, UpstreamError>;
}
