//! Logging initialization and configuration.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when the configured one does not parse.
pub const DEFAULT_FILTER: &str = "secure_crud=info,tower_http=info";

fn build_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the logging system with the given filter directives.
///
/// # Panics
///
/// Panics if called more than once, or if another tracing subscriber
/// has already been set.
pub fn init(directives: &str) {
    tracing_subscriber::registry()
        .with(build_filter(directives))
        .with(tracing_subscriber::fmt::layer().compact())
        .init();
}

/// Try to initialize the logging system.
///
/// Returns `Ok(())` if successful, or `Err` if logging has already been
/// initialized.
pub fn try_init(directives: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(build_filter(directives))
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_idempotent() {
        // Either call may be the first one in this test binary.
        let _ = try_init("debug");
        let _ = try_init("debug");
    }

    #[test]
    fn test_invalid_directive_falls_back() {
        let filter = build_filter("secure_crud=[");
        assert!(filter.to_string().contains("secure_crud"));
    }

    #[test]
    fn test_logging_works() {
        let _ = try_init(DEFAULT_FILTER);

        tracing::info!("test info message");
        tracing::debug!(field = 1, "test debug message");
        tracing::warn!("test warn message");
    }
}
