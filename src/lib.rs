//! Chat Stream Library
//!
//! Streaming chat-completion client for OpenAI-compatible, Gemini and Player2
//! backends, with liveness monitoring and Player2 local-app authentication

pub mod config;
pub mod models;
pub mod providers;
pub mod services;
pub mod utils;

// Re-export common types
pub use config::{AppConfig, ProviderConfig, Settings};
pub use models::{Message, Payload, Role};
pub use providers::Protocol;
pub use services::{AuthResolver, StreamingClient};
pub use tokio_util::sync::CancellationToken;
pub use utils::error::{ErrorKind, StreamError, StreamResult};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version information
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
