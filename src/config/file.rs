//! File-based configuration loading
//!
//! Loads named provider configurations from a JSON file

use crate::providers::Protocol;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Application configuration loaded from JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider configurations by name
    pub providers: HashMap<String, ProviderConfig>,

    /// Provider used when none is named explicitly
    #[serde(rename = "defaultProvider", default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,
}

/// Provider configuration
///
/// Immutable for the duration of one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Wire protocol
    pub protocol: Protocol,

    /// Base URL for the provider API. For Player2 this is the hosted API used
    /// when the local app is unavailable.
    #[serde(rename = "baseUrl", default)]
    pub base_url: String,

    /// API key. For Player2 this is the fallback key for the hosted API.
    #[serde(rename = "apiKey", default)]
    pub api_key: String,

    /// Model name (ignored by Player2)
    #[serde(default)]
    pub model: String,

    /// Custom headers to add to requests
    #[serde(rename = "extraHeaders", default, skip_serializing_if = "HashMap::is_empty")]
    pub extra_headers: HashMap<String, String>,

    /// Override of the connect timeout, in seconds
    #[serde(rename = "connectTimeoutSecs", default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,

    /// Override of the read timeout, in seconds
    #[serde(rename = "readTimeoutSecs", default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_secs: Option<u64>,
}

impl ProviderConfig {
    pub fn new(protocol: Protocol, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            protocol,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            extra_headers: HashMap::new(),
            connect_timeout_secs: None,
            read_timeout_secs: None,
        }
    }

    /// Add a request header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.extra_headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Override both liveness timeouts
    pub fn with_timeouts(mut self, connect_secs: u64, read_secs: u64) -> Self {
        self.connect_timeout_secs = Some(connect_secs);
        self.read_timeout_secs = Some(read_secs);
        self
    }

    /// Check the fields the protocol needs before any request is attempted
    pub fn validate(&self, name: &str) -> Result<()> {
        if !self.base_url.is_empty() && !self.base_url.starts_with("http") {
            anyhow::bail!("Invalid base URL for provider '{}': {}", name, self.base_url);
        }

        match self.protocol {
            Protocol::OpenAi => {
                if self.base_url.is_empty() {
                    anyhow::bail!("Provider '{}' must have a base URL", name);
                }
                if self.model.is_empty() {
                    anyhow::bail!("Provider '{}' must have a model configured", name);
                }
            }
            Protocol::Gemini => {
                if self.model.is_empty() {
                    anyhow::bail!("Provider '{}' must have a model configured", name);
                }
                if self.api_key.is_empty() {
                    anyhow::bail!("Provider '{}' must have an API key", name);
                }
            }
            // local app login may supply the key
            Protocol::Player2 => {}
        }

        if self.connect_timeout_secs == Some(0) || self.read_timeout_secs == Some(0) {
            anyhow::bail!("Timeout values for provider '{}' cannot be 0", name);
        }

        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading configuration from: {:?}", path);

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: AppConfig =
            serde_json::from_str(&content).with_context(|| "Failed to parse config JSON")?;

        config.validate()?;

        debug!("Loaded {} providers", config.providers.len());
        Ok(config)
    }

    /// Load configuration from default locations
    /// Searches in order:
    /// 1. ~/.config/chatstream/chatstream.json
    /// 2. ./chatstream.json
    ///
    /// Returns error if no configuration file is found.
    pub fn load_default() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("chatstream").join("chatstream.json");
            if config_path.exists() {
                return Self::load(&config_path);
            }
        }

        let local_path = Path::new("chatstream.json");
        if local_path.exists() {
            return Self::load(local_path);
        }

        anyhow::bail!(
            "Configuration file not found. Please create one at:\n\
             - ~/.config/chatstream/chatstream.json (recommended)\n\
             - ./chatstream.json (current directory)"
        )
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            anyhow::bail!("At least one provider must be configured");
        }

        for (name, provider) in &self.providers {
            provider.validate(name)?;
        }

        if let Some(default) = &self.default_provider {
            if !self.providers.contains_key(default) {
                anyhow::bail!("Default provider '{}' is not configured", default);
            }
        }

        Ok(())
    }

    /// Get a provider by name
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Pick a provider: the named one, else `defaultProvider`, else the only one
    pub fn select(&self, name: Option<&str>) -> Result<(&str, &ProviderConfig)> {
        let name = match name.or(self.default_provider.as_deref()) {
            Some(name) => name,
            None if self.providers.len() == 1 => {
                return self
                    .providers
                    .iter()
                    .next()
                    .map(|(n, p)| (n.as_str(), p))
                    .context("No provider configured");
            }
            None => anyhow::bail!(
                "Several providers are configured; name one or set defaultProvider"
            ),
        };

        self.providers
            .get_key_value(name)
            .map(|(n, p)| (n.as_str(), p))
            .with_context(|| format!("Unknown provider: {}", name))
    }

    /// List configured provider names, sorted
    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}
