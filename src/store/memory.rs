//! In-memory storage backend.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use super::{Comment, CommentStore, NewUser, RecordId, StoreError, User, UserStore};

/// Thread-safe in-memory store for users and comments.
///
/// Identifiers start at 1 and are never reused, even after deletion.
#[derive(Debug)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<RecordId, User>>,
    comments: RwLock<BTreeMap<RecordId, Comment>>,
    next_user_id: AtomicI64,
    next_comment_id: AtomicI64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            comments: RwLock::new(BTreeMap::new()),
            next_user_id: AtomicI64::new(1),
            next_comment_id: AtomicI64::new(1),
        }
    }

    /// Number of stored users.
    pub fn user_count(&self) -> usize {
        self.users.read().map(|u| u.len()).unwrap_or(0)
    }

    /// Number of stored comments.
    pub fn comment_count(&self) -> usize {
        self.comments.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::LockPoisoned)?;

        let id = self.next_user_id.fetch_add(1, Ordering::Relaxed);
        let user = User {
            id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            age: user.age,
        };
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(users.values().cloned().collect())
    }

    async fn find_user(&self, id: RecordId) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(users.get(&id).cloned())
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create_comment(&self, content: String) -> Result<Comment, StoreError> {
        let mut comments = self
            .comments
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;

        let id = self.next_comment_id.fetch_add(1, Ordering::Relaxed);
        let comment = Comment {
            id,
            content,
            created_at: Utc::now(),
        };
        comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self) -> Result<Vec<Comment>, StoreError> {
        let comments = self
            .comments
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;

        let mut list: Vec<Comment> = comments.values().cloned().collect();
        // Identifier breaks ties between comments created in the same instant.
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(list)
    }

    async fn find_comment(&self, id: RecordId) -> Result<Option<Comment>, StoreError> {
        let comments = self
            .comments
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(comments.get(&id).cloned())
    }

    async fn delete_comment(&self, id: RecordId) -> Result<bool, StoreError> {
        let mut comments = self
            .comments
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(comments.remove(&id).is_some())
    }
}
