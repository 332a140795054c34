//! API router configuration.
//!
//! Every endpoint is composed explicitly: its rate-limit classes are attached
//! as a route layer, and the handler runs validation, sanitization and the
//! persistence call in order.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{any, delete, get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::handlers::{
    create_comment, delete_comment, deprecated_query, get_comment, get_user, health,
    list_comments, list_users, not_found, populate_users, AppState,
};
use crate::error::AppError;
use crate::security::{
    cors_layer, rate_limit_middleware, with_security_headers, LimitClass, RateLimitPolicy,
    POPULATE_CLASSES, READ_CLASSES, WRITE_CLASSES,
};

/// Default request body cap (10 KB).
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024;

/// Create the API router with default server settings.
pub fn create_router(state: AppState) -> Router {
    create_router_with_config(state, &ServerConfig::default())
}

/// Create the API router with custom settings.
pub fn create_router_with_config(state: AppState, config: &ServerConfig) -> Router {
    let limiter = Arc::clone(&state.limiter);
    let limit = |classes: &'static [LimitClass]| {
        from_fn_with_state(
            RateLimitPolicy::new(Arc::clone(&limiter), classes),
            rate_limit_middleware,
        )
    };

    let router = Router::new()
        .route("/health", get(health))
        .route(
            "/populate",
            get(populate_users).route_layer(limit(POPULATE_CLASSES)),
        )
        .route("/users", get(list_users).route_layer(limit(READ_CLASSES)))
        .route("/user", post(get_user).route_layer(limit(READ_CLASSES)))
        .route(
            "/comment",
            post(create_comment).route_layer(limit(WRITE_CLASSES)),
        )
        .route(
            "/comments",
            get(list_comments).route_layer(limit(READ_CLASSES)),
        )
        .route(
            "/comments/{id}",
            get(get_comment)
                .route_layer(limit(READ_CLASSES))
                .merge(delete(delete_comment).route_layer(limit(WRITE_CLASSES))),
        )
        .route(
            "/query",
            post(deprecated_query).route_layer(limit(READ_CLASSES)),
        )
        .method_not_allowed_fallback(any(not_found).layer(limit(READ_CLASSES)))
        .fallback(any(not_found).layer(limit(READ_CLASSES)))
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.allowed_origins));

    with_security_headers(router).with_state(state)
}

/// Last-resort mapping of a handler panic to a 500 envelope.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    AppError::Unexpected(format!("handler panicked: {}", detail)).into_response()
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Stop accepting on Ctrl-C / SIGTERM and drain in-flight requests.
    pub graceful_shutdown: bool,
    /// Maximum accepted request body in bytes.
    pub body_limit_bytes: usize,
    /// Origins allowed by the CORS policy.
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit_bytes = bytes;
        self
    }

    pub fn without_graceful_shutdown(mut self) -> Self {
        self.graceful_shutdown = false;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            graceful_shutdown: true,
            body_limit_bytes: DEFAULT_BODY_LIMIT,
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Start the API server with the given state.
pub async fn serve(config: ServerConfig, state: AppState) -> std::io::Result<()> {
    let addr = config.bind_address();
    let router = create_router_with_config(state, &config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %listener.local_addr()?, "secure-crud API listening");

    let app = router.into_make_service_with_connect_info::<SocketAddr>();

    if config.graceful_shutdown {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    } else {
        axum::serve(listener, app).await?;
    }

    tracing::info!("secure-crud API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3001);
        assert_eq!(config.bind_address(), "127.0.0.1:3001");
        assert_eq!(config.body_limit_bytes, 10 * 1024);
    }

    #[test]
    fn test_server_config_custom() {
        let config = ServerConfig::new("0.0.0.0", 8080).with_body_limit(512);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.body_limit_bytes, 512);
        assert!(config.graceful_shutdown);
    }

    #[test]
    fn test_panic_response_is_500() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(
            response.status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
