//! Configuration management for secure-crud.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::router::DEFAULT_BODY_LIMIT;
use crate::api::ServerConfig;
use crate::cli::Args;
use crate::security::{ClassLimit, RateLimitConfig};
use crate::upstream::random_user::DEFAULT_BASE_URL;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Cross-origin policy.
    pub cors: CorsSection,
    /// Rate limiting configuration.
    pub rate_limit: RateLimitSection,
    /// Random-user source.
    pub upstream: UpstreamSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable graceful shutdown.
    pub graceful_shutdown: bool,
    /// Request body cap in bytes.
    pub body_limit_bytes: usize,
    /// Bound on a single persistence call.
    pub store_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            graceful_shutdown: true,
            body_limit_bytes: DEFAULT_BODY_LIMIT,
            store_timeout_secs: 5,
        }
    }
}

/// CORS section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsSection {
    /// Origins allowed to call the API from a browser.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsSection {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Window and ceiling of one limiter class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LimitSection {
    /// Requests per window.
    pub max_requests: u32,
    /// Window size in seconds.
    pub window_secs: u64,
}

impl From<LimitSection> for ClassLimit {
    fn from(section: LimitSection) -> Self {
        ClassLimit::new(section.max_requests, section.window_secs)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    /// Enable rate limiting.
    pub enabled: bool,
    pub general: LimitSection,
    pub write: LimitSection,
    pub populate: LimitSection,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            enabled: true,
            general: LimitSection {
                max_requests: 100,
                window_secs: 15 * 60,
            },
            write: LimitSection {
                max_requests: 50,
                window_secs: 15 * 60,
            },
            populate: LimitSection {
                max_requests: 10,
                window_secs: 60 * 60,
            },
        }
    }
}

/// Random-user source section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSection {
    /// Base URL of the randomuser.me-compatible API.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log filter (error, warn, info, debug, trace, or an EnvFilter directive).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup (for testing).
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SECURE_CRUD_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("SECURE_CRUD_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "ignoring invalid SECURE_CRUD_PORT"),
            }
        }

        if let Some(origin) = lookup("SECURE_CRUD_FRONTEND_URL") {
            if !origin.is_empty() {
                self.cors.allowed_origins = vec![origin];
            }
        }

        if let Some(url) = lookup("SECURE_CRUD_RANDOM_USER_URL") {
            self.upstream.base_url = url;
        }

        if let Some(level) = lookup("SECURE_CRUD_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }

        if let Some(port) = args.port {
            self.server.port = port;
        }

        if args.no_rate_limit {
            self.rate_limit.enabled = false;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Convert to ServerConfig for the API server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        if self.server.body_limit_bytes == 0 {
            return Err(ConfigError::InvalidValue(
                "server.body_limit_bytes must be greater than zero",
            ));
        }

        let mut server_config = ServerConfig::new(host.to_string(), self.server.port)
            .with_body_limit(self.server.body_limit_bytes)
            .with_allowed_origins(self.cors.allowed_origins.clone());

        if !self.server.graceful_shutdown {
            server_config = server_config.without_graceful_shutdown();
        }

        Ok(server_config)
    }

    /// Convert to the limiter configuration.
    pub fn rate_limit_config(&self) -> Result<RateLimitConfig, ConfigError> {
        let section = &self.rate_limit;
        for limit in [section.general, section.write, section.populate] {
            if limit.window_secs == 0 {
                return Err(ConfigError::InvalidValue(
                    "rate_limit window_secs must be greater than zero",
                ));
            }
        }

        Ok(RateLimitConfig {
            enabled: section.enabled,
            general: section.general.into(),
            write: section.write.into(),
            populate: section.populate.into(),
            ..RateLimitConfig::default()
        })
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.server.store_timeout_secs.max(1))
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_secs.max(1))
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing error.
    #[error("failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),
    /// Invalid host address.
    #[error("invalid host address: {0}")]
    InvalidHost(String),
    /// Out-of-range setting.
    #[error("invalid configuration: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.body_limit_bytes, 10 * 1024);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.cors.allowed_origins, vec!["http://localhost:3000"]);
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "server": {
                "host": "0.0.0.0",
                "port": 8080
            },
            "rate_limit": {
                "populate": { "max_requests": 2, "window_secs": 60 }
            },
            "cors": {
                "allowed_origins": ["https://app.example.com"]
            }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.rate_limit.populate.max_requests, 2);
        assert_eq!(config.rate_limit.general.max_requests, 100); // Default
        assert_eq!(config.cors.allowed_origins, vec!["https://app.example.com"]);
    }

    #[test]
    fn test_config_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let result = Config::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_apply_env() {
        let vars: HashMap<&str, &str> = [
            ("SECURE_CRUD_PORT", "4000"),
            ("SECURE_CRUD_FRONTEND_URL", "https://ui.example.com"),
            ("RUST_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.cors.allowed_origins, vec!["https://ui.example.com"]);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_apply_env_ignores_bad_port() {
        let mut config = Config::default();
        config.apply_env_from(|key| (key == "SECURE_CRUD_PORT").then(|| "nope".to_string()));
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        let args = Args {
            host: Some("192.168.1.1".parse().unwrap()),
            port: Some(5000),
            no_rate_limit: true,
            log_level: Some("trace".into()),
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 5000);
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.log_filter(), "trace");
    }

    #[test]
    fn test_unset_args_keep_config() {
        let mut config = Config::default();
        config.server.port = 9999;

        config.apply_args(&Args::default());
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn test_to_server_config() {
        let server_config = Config::default().to_server_config().unwrap();
        assert_eq!(server_config.host, "127.0.0.1");
        assert_eq!(server_config.port, 3001);
        assert_eq!(server_config.body_limit_bytes, 10 * 1024);
    }

    #[test]
    fn test_invalid_host() {
        let mut config = Config::default();
        config.server.host = "not-an-ip".to_string();
        assert!(matches!(
            config.to_server_config(),
            Err(ConfigError::InvalidHost(_))
        ));
    }

    #[test]
    fn test_rate_limit_config() {
        let limits = Config::default().rate_limit_config().unwrap();
        assert_eq!(limits.general, ClassLimit::new(100, 900));
        assert_eq!(limits.write, ClassLimit::new(50, 900));
        assert_eq!(limits.populate, ClassLimit::new(10, 3600));
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = Config::default();
        config.rate_limit.write.window_secs = 0;
        assert!(config.rate_limit_config().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let json = serde_json::to_string_pretty(&Config::default()).unwrap();
        assert!(json.contains("\"host\""));
        assert!(json.contains("\"allowed_origins\""));
    }
}
