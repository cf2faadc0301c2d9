// ============================================
// File: crates/cipherchat-server/src/config.rs
// ============================================
//! # Server Configuration
//!
//! ## Creation Reason
//! Session lifetime, store capacity and relay behavior differ between a
//! test run and a deployment; they are read from a TOML file rather than
//! compiled in.
//!
//! ## Configuration Sections
//! - `session`: TTL, sweep interval, capacity, reuse policy
//! - `relay`: In-process queue depth, presence precheck
//! - `logging`: Log level
//!
//! ## Example Configuration
//! ```toml
//! [session]
//! ttl_secs = 3600
//! sweep_interval_secs = 300
//! max_sessions = 10000
//! reuse_policy = "reject"
//!
//! [relay]
//! queue_depth = 256
//! presence_precheck = true
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - All config changes require restart
//! - Every section is optional; missing keys take the defaults below
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ServerError};

// ============================================
// ServerConfig
// ============================================

/// Main server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Session store settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Relay settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// `ConfigInvalid` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        self.session.validate()?;
        self.relay.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Serializes configuration to TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl FromStr for ServerConfig {
    type Err = ServerError;

    fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ServerError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================
// ReusePolicy
// ============================================

/// What `initiate` does when the pair already has a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReusePolicy {
    /// Fail with `SessionAlreadyActive`.
    #[default]
    Reject,
    /// Replace the live session with the new attempt.
    Supersede,
}

// ============================================
// SessionConfig
// ============================================

/// Session store configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum session age in seconds, pending or completed.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Seconds between expiry sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Maximum number of sessions held at once.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Behavior on `initiate` for a pair with a live session.
    #[serde(default)]
    pub reuse_policy: ReusePolicy,
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_max_sessions() -> usize {
    10_000
}

impl SessionConfig {
    fn validate(&self) -> Result<()> {
        if self.ttl_secs == 0 {
            return Err(ServerError::config_invalid(
                "session.ttl_secs",
                "must be greater than 0",
            ));
        }

        if self.sweep_interval_secs == 0 {
            return Err(ServerError::config_invalid(
                "session.sweep_interval_secs",
                "must be greater than 0",
            ));
        }

        if self.max_sessions == 0 {
            return Err(ServerError::config_invalid(
                "session.max_sessions",
                "must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Returns the TTL as a `Duration`.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Returns the sweep interval as a `Duration`.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_sessions: default_max_sessions(),
            reuse_policy: ReusePolicy::default(),
        }
    }
}

// ============================================
// RelayConfig
// ============================================

/// Relay configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Per-connection event queue depth of the in-process relay.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Ask the relay whether the target is online before creating a
    /// session.
    #[serde(default = "default_presence_precheck")]
    pub presence_precheck: bool,
}

fn default_queue_depth() -> usize {
    cipherchat_relay::DEFAULT_QUEUE_DEPTH
}

fn default_presence_precheck() -> bool {
    true
}

impl RelayConfig {
    fn validate(&self) -> Result<()> {
        if self.queue_depth == 0 {
            return Err(ServerError::config_invalid(
                "relay.queue_depth",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            queue_depth: default_queue_depth(),
            presence_precheck: default_presence_precheck(),
        }
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    fn validate(&self) -> Result<()> {
        match self.level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(ServerError::config_invalid(
                "logging.level",
                format!("unknown level '{}'", self.level),
            )),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.ttl(), Duration::from_secs(3600));
        assert_eq!(config.session.sweep_interval(), Duration::from_secs(300));
        assert_eq!(config.session.reuse_policy, ReusePolicy::Reject);
        assert!(config.relay.presence_precheck);
    }

    #[test]
    fn test_full_config_format() {
        let toml = r#"
            [session]
            ttl_secs = 600
            sweep_interval_secs = 30
            max_sessions = 50
            reuse_policy = "supersede"

            [relay]
            queue_depth = 8
            presence_precheck = false

            [logging]
            level = "debug"
        "#;

        let config: ServerConfig = toml.parse().unwrap();
        assert_eq!(config.session.ttl_secs, 600);
        assert_eq!(config.session.max_sessions, 50);
        assert_eq!(config.session.reuse_policy, ReusePolicy::Supersede);
        assert_eq!(config.relay.queue_depth, 8);
        assert!(!config.relay.presence_precheck);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ServerConfig = "[session]\nttl_secs = 10\n".parse().unwrap();
        assert_eq!(config.session.ttl_secs, 10);
        assert_eq!(config.session.sweep_interval_secs, 300);
        assert_eq!(config.relay.queue_depth, 256);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: ServerConfig = "".parse().unwrap();
        assert_eq!(config.session.max_sessions, 10_000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = "[session]\nttl_secs = 0\n".parse::<ServerConfig>().unwrap_err();
        assert!(matches!(err, ServerError::ConfigInvalid { ref field, .. } if field == "session.ttl_secs"));

        let err = "[relay]\nqueue_depth = 0\n".parse::<ServerConfig>().unwrap_err();
        assert!(err.is_config_error());

        let err = "[logging]\nlevel = \"loud\"\n".parse::<ServerConfig>().unwrap_err();
        assert!(err.to_string().contains("logging.level"));

        let err = "[session]\nreuse_policy = \"sometimes\"\n".parse::<ServerConfig>().unwrap_err();
        assert!(matches!(err, ServerError::ConfigLoad { .. }));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ServerConfig::default();
        let reparsed: ServerConfig = config.to_toml().parse().unwrap();
        assert_eq!(reparsed.session.ttl_secs, config.session.ttl_secs);
        assert_eq!(reparsed.session.reuse_policy, config.session.reuse_policy);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = ServerConfig::load("/nonexistent/cipherchat.toml").await.unwrap_err();
        assert!(matches!(err, ServerError::ConfigLoad { .. }));
    }
}
