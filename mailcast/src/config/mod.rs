//! Configuration management
//!
//! Settings are loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `MAILCAST_` prefix,
//!    `__` as the section separator, e.g. `MAILCAST_SERVICE__PORT=8080`)
//! 2. `./config.toml`
//! 3. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # config.toml
//! [service]
//! name = "mailcast"
//! port = 3000
//! base_url = "https://mail.example.com"
//!
//! [database]
//! url = "postgres://localhost/mailcast"
//!
//! [queue]
//! max_attempts = 3
//! backoff_base_secs = 5
//! concurrency = 4
//!
//! [tracking]
//! secret = "openssl rand -base64 48 output goes here........."
//! ```

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::MailcastError;

/// HTTP service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name used in logs
    pub name: String,

    /// Port the HTTP server binds to
    pub port: u16,

    /// Public base URL, used for unsubscribe and tracking links
    pub base_url: String,

    /// Fallback sender address when a campaign has none configured
    pub default_from: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "mailcast".to_string(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            default_from: "hello@mailcast.local".to_string(),
        }
    }
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection URL
    pub url: String,

    /// Maximum pool connections
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/mailcast".to_string(),
            max_connections: 10,
        }
    }
}

/// Send job queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Attempts per job, including the first
    pub max_attempts: u32,

    /// Base delay for exponential retry backoff, in seconds
    pub backoff_base_secs: u64,

    /// Jobs processed in parallel per worker process
    pub concurrency: usize,

    /// Idle poll interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_secs: 5,
            concurrency: 4,
            poll_interval_ms: 1000,
        }
    }
}

/// Tracking and unsubscribe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSettings {
    /// Secret key for signing unsubscribe tokens
    pub secret: String,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            // Development-only default; overridden in any real deployment
            secret: "mailcast-dev-secret-not-for-production-use".to_string(),
        }
    }
}

/// Complete mailcast configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MailcastConfig {
    /// HTTP service settings
    #[serde(default)]
    pub service: ServiceSettings,

    /// Database settings
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Send job queue settings
    #[serde(default)]
    pub queue: QueueSettings,

    /// Tracking and unsubscribe settings
    #[serde(default)]
    pub tracking: TrackingSettings,
}

impl MailcastConfig {
    /// Load configuration from `./config.toml` plus `MAILCAST_` environment
    /// overrides
    pub fn load() -> Result<Self, MailcastError> {
        Self::load_from("config.toml")
    }

    /// Load configuration from a specific file plus environment overrides
    pub fn load_from(path: &str) -> Result<Self, MailcastError> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("MAILCAST_").split("__"))
            .extract()
            .map_err(|e| MailcastError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MailcastConfig::default();
        assert_eq!(config.service.port, 3000);
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.queue.backoff_base_secs, 5);
        assert_eq!(config.queue.concurrency, 4);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = MailcastConfig::load_from("does-not-exist.toml")
            .expect("missing file should not be an error");
        assert_eq!(config.service.name, "mailcast");
    }
}
