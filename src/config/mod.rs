//! Configuration management module
//!
//! Process settings come from environment variables; provider definitions
//! come from a JSON configuration file.

pub mod file;
pub mod settings;

pub use file::{AppConfig, ProviderConfig};
pub use settings::{LoggingConfig, Player2Settings, Settings, TimeoutSettings};
