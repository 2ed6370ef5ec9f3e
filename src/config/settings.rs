//! Application configuration settings
//!
//! Process-wide timeouts, Player2 local-app parameters and logging, read from
//! the environment

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Liveness timeouts
    pub timeouts: TimeoutSettings,
    /// Player2 local app configuration
    pub player2: Player2Settings,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Liveness timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutSettings {
    /// Wait for the first byte from a remote endpoint, in seconds
    pub connect_secs: u64,
    /// Wait for the first byte from a local endpoint, in seconds
    pub local_connect_secs: u64,
    /// Maximum stall once bytes are flowing, in seconds
    pub read_secs: u64,
    /// Progress poll interval in milliseconds
    pub poll_interval_ms: u64,
}

/// Player2 local app configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player2Settings {
    /// Base URL of the local companion app
    pub local_url: String,
    /// Game client id sent on login and in the game-key header
    pub client_id: String,
    /// Lifetime of a key obtained from the local app, in seconds
    pub key_ttl_secs: u64,
    /// Health probe timeout in seconds
    pub health_timeout_secs: u64,
    /// Login timeout in seconds
    pub login_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (text/json)
    pub format: String,
}

pub const DEFAULT_PLAYER2_LOCAL_URL: &str = "http://localhost:4315";
pub const DEFAULT_PLAYER2_CLIENT_ID: &str = "019a8368-b00b-72bc-b367-2825079dc6fb";

/// Longest accepted local key lifetime (one week)
pub const MAX_KEY_TTL_SECS: u64 = 7 * 24 * 60 * 60;

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeouts: TimeoutSettings {
                connect_secs: 60,
                local_connect_secs: 300,
                read_secs: 60,
                poll_interval_ms: 100,
            },
            player2: Player2Settings {
                local_url: DEFAULT_PLAYER2_LOCAL_URL.to_string(),
                client_id: DEFAULT_PLAYER2_CLIENT_ID.to_string(),
                key_ttl_secs: 30 * 60,
                health_timeout_secs: 2,
                login_timeout_secs: 3,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
            },
        }
    }
}

impl Settings {
    /// Create a new configuration instance
    pub fn new() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let settings = Self {
            timeouts: TimeoutSettings {
                connect_secs: get_env_or_default("CONNECT_TIMEOUT", "60")
                    .parse()
                    .context("Invalid connect timeout")?,
                local_connect_secs: get_env_or_default("LOCAL_CONNECT_TIMEOUT", "300")
                    .parse()
                    .context("Invalid local connect timeout")?,
                read_secs: get_env_or_default("READ_TIMEOUT", "60")
                    .parse()
                    .context("Invalid read timeout")?,
                poll_interval_ms: get_env_or_default("POLL_INTERVAL_MS", "100")
                    .parse()
                    .context("Invalid poll interval")?,
            },
            player2: Player2Settings {
                local_url: get_env_or_default("PLAYER2_LOCAL_URL", DEFAULT_PLAYER2_LOCAL_URL),
                client_id: get_env_or_default("PLAYER2_CLIENT_ID", DEFAULT_PLAYER2_CLIENT_ID),
                key_ttl_secs: get_env_or_default("PLAYER2_KEY_TTL", "1800")
                    .parse()
                    .context("Invalid Player2 key TTL")?,
                health_timeout_secs: 2,
                login_timeout_secs: 3,
            },
            logging: LoggingConfig {
                level: get_env_or_default("RUST_LOG", "info"),
                format: get_env_or_default("LOG_FORMAT", "text"),
            },
        };

        // Validate configuration
        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration validity
    pub fn validate(&self) -> Result<()> {
        let t = &self.timeouts;
        if t.connect_secs == 0 || t.local_connect_secs == 0 || t.read_secs == 0 {
            anyhow::bail!("Timeout values cannot be 0");
        }
        if t.poll_interval_ms == 0 {
            anyhow::bail!("Poll interval cannot be 0");
        }
        if t.poll_interval_ms >= t.read_secs.min(t.connect_secs).saturating_mul(1000) {
            anyhow::bail!("Poll interval must be shorter than every timeout");
        }

        if !self.player2.local_url.starts_with("http") {
            anyhow::bail!("Invalid Player2 local URL format, should start with 'http'");
        }
        if self.player2.client_id.trim().is_empty() {
            anyhow::bail!("Player2 client id cannot be empty");
        }
        if self.player2.key_ttl_secs == 0 || self.player2.key_ttl_secs > MAX_KEY_TTL_SECS {
            anyhow::bail!(
                "Player2 key TTL must be between 1 and {} seconds",
                MAX_KEY_TTL_SECS
            );
        }

        // Accept bare levels as well as full filter directives
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !self.logging.level.contains('=') && !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.timeouts.poll_interval_ms)
    }

    pub fn key_ttl(&self) -> Duration {
        Duration::from_secs(self.player2.key_ttl_secs)
    }
}

/// Get environment variable or default value
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.timeouts.connect_secs, 60);
        assert_eq!(settings.timeouts.local_connect_secs, 300);
        assert_eq!(settings.poll_interval(), Duration::from_millis(100));
        assert_eq!(settings.key_ttl(), Duration::from_secs(1800));
        assert_eq!(settings.player2.local_url, "http://localhost:4315");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        settings.timeouts.read_secs = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.logging.format = "xml".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.logging.level = "chatstream=debug".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_extreme_values() {
        let mut settings = Settings::default();
        settings.timeouts.connect_secs = u64::MAX;
        settings.timeouts.read_secs = u64::MAX;
        assert!(settings.validate().is_ok());

        let mut settings = Settings::default();
        settings.player2.key_ttl_secs = MAX_KEY_TTL_SECS;
        assert!(settings.validate().is_ok());
        settings.player2.key_ttl_secs = i64::MAX as u64 + 1;
        assert!(settings.validate().is_err());
    }
}
