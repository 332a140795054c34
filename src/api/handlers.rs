//! REST API handlers.
//!
//! Rate limiting has already run when a handler is entered. Each handler is a
//! fixed pipeline: validate, sanitize where applicable, one persistence call,
//! shape the response.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::extract::RawBody;
use super::types::{
    parse_json, Envelope, HealthResponse, MessageEnvelope, UserSummary,
};
use crate::error::{AppError, Result};
use crate::security::{CommentBody, InputValidator, MarkupSanitizer, RateLimiter};
use crate::store::{Comment, CommentStore, MemoryStore, NewUser, StoreError, User, UserStore};
use crate::upstream::{CandidateUser, UserSource};

/// Number of users created by one bulk-populate call.
pub const POPULATE_COUNT: usize = 3;

/// Default bound on a single persistence call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub comments: Arc<dyn CommentStore>,
    pub source: Arc<dyn UserSource>,
    pub limiter: Arc<RateLimiter>,
    pub validator: Arc<InputValidator>,
    pub store_timeout: Duration,
}

impl AppState {
    /// State over explicit collaborators.
    pub fn new(
        users: Arc<dyn UserStore>,
        comments: Arc<dyn CommentStore>,
        source: Arc<dyn UserSource>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            users,
            comments,
            source,
            limiter,
            validator: Arc::new(InputValidator::default()),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// State backed by one fresh [`MemoryStore`].
    pub fn in_memory(source: Arc<dyn UserSource>, limiter: Arc<RateLimiter>) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store, source, limiter)
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Run a persistence call, failing instead of hanging past the timeout.
    async fn persist<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::Timeout.into()),
        }
    }
}

impl From<CandidateUser> for NewUser {
    fn from(candidate: CandidateUser) -> Self {
        Self {
            first_name: candidate.first_name,
            last_name: candidate.last_name,
            email: candidate.email,
            age: candidate.age,
        }
    }
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        status: "ok",
    })
}

/// Fetch candidates from the external source and persist each as a user.
///
/// Creations are not atomic as a group: if one insert fails, users created
/// earlier in the same call stay persisted.
pub async fn populate_users(State(state): State<AppState>) -> Result<Json<Envelope<Vec<User>>>> {
    let candidates = state.source.fetch_users(POPULATE_COUNT).await?;

    let mut created = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match state.persist(state.users.create_user(candidate.into())).await {
            Ok(user) => created.push(user),
            Err(e) => {
                tracing::warn!(persisted = created.len(), "populate aborted after partial insert");
                return Err(e);
            }
        }
    }

    tracing::info!(count = created.len(), "users populated");
    Ok(Json(Envelope::new(created)))
}

/// List all users in summary form.
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Envelope<Vec<UserSummary>>>> {
    let users = state.persist(state.users.list_users()).await?;
    Ok(Json(Envelope::new(
        users.into_iter().map(UserSummary::from).collect(),
    )))
}

/// Look up one user by the `userId` carried in the JSON body.
pub async fn get_user(
    State(state): State<AppState>,
    body: RawBody,
) -> Result<Json<Envelope<User>>> {
    let payload = parse_json(&body.bytes).map_err(|e| AppError::ValidationFailed(vec![e]))?;
    let id = state
        .validator
        .validate_id_value("userId", payload.get("userId"))
        .map_err(|e| AppError::ValidationFailed(vec![e]))?;

    let user = state
        .persist(state.users.find_user(id))
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(Envelope::new(user)))
}

/// Create a comment from a plain-text or `{"comment": ...}` body.
pub async fn create_comment(
    State(state): State<AppState>,
    body: RawBody,
) -> Result<(StatusCode, Json<Envelope<Comment>>)> {
    let resolved = CommentBody::resolve(body.kind, &body.bytes)
        .map_err(|e| AppError::ValidationFailed(vec![e]))?;
    let valid = state
        .validator
        .validate_comment(&resolved)
        .map_err(AppError::ValidationFailed)?;

    if MarkupSanitizer::contains_markup(valid.as_str()) {
        tracing::debug!(submitted = valid.as_str().len(), "markup found in comment");
    }
    let content = MarkupSanitizer::strip(valid.as_str());

    let comment = state.persist(state.comments.create_comment(content)).await?;
    tracing::info!(id = comment.id, "comment created");

    Ok((StatusCode::CREATED, Json(Envelope::new(comment))))
}

/// List comments, most recent first.
pub async fn list_comments(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Vec<Comment>>>> {
    let comments = state.persist(state.comments.list_comments()).await?;
    Ok(Json(Envelope::new(comments)))
}

/// Get one comment.
pub async fn get_comment(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Envelope<Comment>>> {
    let id = state
        .validator
        .validate_id_str("id", &raw_id)
        .map_err(|e| AppError::ValidationFailed(vec![e]))?;

    let comment = state
        .persist(state.comments.find_comment(id))
        .await?
        .ok_or(AppError::NotFound("Comment"))?;

    Ok(Json(Envelope::new(comment)))
}

/// Delete one comment.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageEnvelope>> {
    let id = state
        .validator
        .validate_id_str("id", &raw_id)
        .map_err(|e| AppError::ValidationFailed(vec![e]))?;

    if !state.persist(state.comments.delete_comment(id)).await? {
        return Err(AppError::NotFound("Comment"));
    }

    tracing::info!(id, "comment deleted");
    Ok(Json(MessageEnvelope::new("Comment deleted successfully")))
}

/// Former raw-query endpoint, permanently disabled.
pub async fn deprecated_query() -> AppError {
    AppError::Gone("This endpoint has been permanently disabled")
}

/// Fallback for unknown routes and unsupported methods on known ones.
pub async fn not_found() -> AppError {
    AppError::NotFound("Route")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::UpstreamError;
    use async_trait::async_trait;
    use axum::body::Bytes;
    use crate::api::types::BodyKind;

    struct NoSource;

    #[async_trait]
    impl UserSource for NoSource {
        async fn fetch_users(
            &self,
            _count: usize,
        ) -> std::result::Result<Vec<CandidateUser>, UpstreamError> {
            Err(UpstreamError::Status(503))
        }
    }

    struct StalledStore;

    #[async_trait]
    impl CommentStore for StalledStore {
        async fn create_comment(&self, _content: String) -> std::result::Result<Comment, StoreError> {
            std::future::pending().await
        }
        async fn list_comments(&self) -> std::result::Result<Vec<Comment>, StoreError> {
            std::future::pending().await
        }
        async fn find_comment(
            &self,
            _id: i64,
        ) -> std::result::Result<Option<Comment>, StoreError> {
            std::future::pending().await
        }
        async fn delete_comment(&self, _id: i64) -> std::result::Result<bool, StoreError> {
            std::future::pending().await
        }
    }

    fn state() -> AppState {
        AppState::in_memory(Arc::new(NoSource), Arc::new(RateLimiter::disabled()))
    }

    fn text(body: &str) -> RawBody {
        RawBody {
            kind: BodyKind::Text,
            bytes: Bytes::from(body.to_string()),
        }
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = health().await;
        assert_eq!(response.0.status, "ok");
        assert!(response.0.success);
    }

    #[tokio::test]
    async fn test_create_comment_stores_sanitized() {
        let state = state();
        let (status, Json(envelope)) =
            create_comment(State(state.clone()), text("  <b>bold</b> move  "))
                .await
                .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(envelope.data.content, "bold move");

        let stored = state.comments.find_comment(envelope.data.id).await.unwrap();
        assert_eq!(stored.map(|c| c.content), Some("bold move".to_string()));
    }

    #[tokio::test]
    async fn test_create_comment_invalid_skips_store() {
        let state = state();
        let result = create_comment(State(state.clone()), text("   ")).await;

        assert!(matches!(result, Err(AppError::ValidationFailed(_))));
        assert!(state.comments.list_comments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_populate_upstream_failure() {
        let result = populate_users(State(state())).await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_store_timeout_surfaces_as_failure() {
        let source: Arc<dyn UserSource> = Arc::new(NoSource);
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(StalledStore),
            source,
            Arc::new(RateLimiter::disabled()),
        )
        .with_store_timeout(Duration::from_millis(20));

        let result = list_comments(State(state)).await;
        assert!(matches!(
            result,
            Err(AppError::Persistence(StoreError::Timeout))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_comment() {
        let result = delete_comment(State(state()), Path("999999".into())).await;
        assert!(matches!(result, Err(AppError::NotFound("Comment"))));
    }

    #[tokio::test]
    async fn test_deprecated_query_is_gone() {
        let err = deprecated_query().await;
        assert_eq!(err.status(), StatusCode::GONE);
    }
}
