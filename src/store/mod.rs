//! Persistence collaborator.
//!
//! The request handlers only talk to storage through [`UserStore`] and
//! [`CommentStore`]. Identifier assignment and creation timestamps belong to
//! the implementation; handlers never cache what they read.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use memory::MemoryStore;

/// Storage-assigned record identifier.
pub type RecordId = i64;

/// A persisted user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: u32,
}

/// User attributes prior to persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: u32,
}

/// A persisted comment. `content` is always sanitized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: RecordId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Storage failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// The storage call did not complete in time.
    #[error("storage call timed out")]
    Timeout,

    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// User persistence operations.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a user and return it with its assigned identifier.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// All users in identifier order.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Look up a single user.
    async fn find_user(&self, id: RecordId) -> Result<Option<User>, StoreError>;
}

/// Comment persistence operations.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Persist already-sanitized content.
    async fn create_comment(&self, content: String) -> Result<Comment, StoreError>;

    /// All comments, most recent first.
    async fn list_comments(&self) -> Result<Vec<Comment>, StoreError>;

    /// Look up a single comment.
    async fn find_comment(&self, id: RecordId) -> Result<Option<Comment>, StoreError>;

    /// Remove a comment. Returns `false` when nothing had that identifier.
    async fn delete_comment(&self, id: RecordId) -> Result<bool, StoreError>;
}
