//! Error handling module
//!
//! Defines the error kinds a streaming call can end with

use crate::models::Payload;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Streaming call error
///
/// Every variant raised after the request was sent carries the partial
/// payload (text streamed so far) once the router has attached it.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Missing endpoint, key, model or messages; raised before any network attempt
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No byte received within the connect timeout
    #[error("Connection timed out (waited {}s for first token)", .timeout.as_secs())]
    ConnectTimeout {
        timeout: Duration,
        partial: Option<Box<Payload>>,
    },

    /// Stream stalled after it started
    #[error("Read timed out (stalled for {}s during generation)", .timeout.as_secs())]
    ReadTimeout {
        timeout: Duration,
        partial: Option<Box<Payload>>,
    },

    /// HTTP or connection level failure
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        status: Option<u16>,
        partial: Option<Box<Payload>>,
    },

    /// Malformed or unexpected frames
    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
        partial: Option<Box<Payload>>,
    },

    /// Credentials rejected
    #[error("Authentication failed: {message}")]
    Auth {
        message: String,
        partial: Option<Box<Payload>>,
    },

    /// Host shutdown observed
    #[error("Cancelled by host shutdown")]
    Cancelled { partial: Option<Box<Payload>> },
}

/// Discriminant of [`StreamError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    ConnectTimeout,
    ReadTimeout,
    Transport,
    Protocol,
    Auth,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::ConnectTimeout => "connect_timeout",
            ErrorKind::ReadTimeout => "read_timeout",
            ErrorKind::Transport => "transport",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Auth => "auth",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

impl StreamError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamError::Configuration(_) => ErrorKind::Configuration,
            StreamError::ConnectTimeout { .. } => ErrorKind::ConnectTimeout,
            StreamError::ReadTimeout { .. } => ErrorKind::ReadTimeout,
            StreamError::Transport { .. } => ErrorKind::Transport,
            StreamError::Protocol { .. } => ErrorKind::Protocol,
            StreamError::Auth { .. } => ErrorKind::Auth,
            StreamError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Get error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            StreamError::Configuration(_) => "configuration_error",
            StreamError::ConnectTimeout { .. } => "connect_timeout_error",
            StreamError::ReadTimeout { .. } => "read_timeout_error",
            StreamError::Transport { .. } => "transport_error",
            StreamError::Protocol { .. } => "protocol_error",
            StreamError::Auth { .. } => "authentication_error",
            StreamError::Cancelled { .. } => "cancelled",
        }
    }

    /// Text streamed before the call stopped
    pub fn partial(&self) -> Option<&Payload> {
        match self {
            StreamError::Configuration(_) => None,
            StreamError::ConnectTimeout { partial, .. }
            | StreamError::ReadTimeout { partial, .. }
            | StreamError::Transport { partial, .. }
            | StreamError::Protocol { partial, .. }
            | StreamError::Auth { partial, .. }
            | StreamError::Cancelled { partial } => partial.as_deref(),
        }
    }

    /// Attach the partial payload; configuration errors have none
    pub fn with_partial(mut self, payload: Payload) -> Self {
        match &mut self {
            StreamError::Configuration(_) => {}
            StreamError::ConnectTimeout { partial, .. }
            | StreamError::ReadTimeout { partial, .. }
            | StreamError::Transport { partial, .. }
            | StreamError::Protocol { partial, .. }
            | StreamError::Auth { partial, .. }
            | StreamError::Cancelled { partial } => *partial = Some(Box::new(payload)),
        }
        self
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StreamError::Cancelled { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StreamError::ConnectTimeout { .. } | StreamError::ReadTimeout { .. })
    }

    /// HTTP status of the failed response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            StreamError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether a cached local credential used for this call must be dropped
    pub fn invalidates_local_credentials(&self) -> bool {
        matches!(self, StreamError::Transport { .. } | StreamError::Auth { .. })
    }

    /// Whether detailed error information should be logged
    pub fn should_log_details(&self) -> bool {
        !matches!(self, StreamError::Auth { .. } | StreamError::Cancelled { .. })
    }

    /// Map a non-success HTTP response to an error kind
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<crate::models::openai::ErrorResponse>(body)
            .map(|e| crate::models::openai::describe_error(&e.error))
            .unwrap_or_else(|_| body.trim().to_string());
        let message = if detail.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {} - {}", status, detail)
        };

        match status {
            401 | 403 => StreamError::Auth { message, partial: None },
            _ => StreamError::Transport { message, status: Some(status), partial: None },
        }
    }

    /// Classify an error the server reported inside an otherwise successful stream
    pub fn from_stream_message(message: &str) -> Self {
        const AUTH_MARKERS: [&str; 6] =
            ["auth", "401", "403", "unauthorized", "forbidden", "api key"];

        let lower = message.to_lowercase();
        if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
            StreamError::Auth { message: message.to_string(), partial: None }
        } else {
            StreamError::Transport {
                message: format!("Error reported in stream: {}", message),
                status: None,
                partial: None,
            }
        }
    }
}

/// Result type alias
pub type StreamResult<T> = Result<T, StreamError>;

/// Error handling helper functions
pub mod helpers {
    use super::*;

    /// Create configuration error
    pub fn config_error(message: impl Into<String>) -> StreamError {
        StreamError::Configuration(message.into())
    }

    /// Create transport error without an HTTP status
    pub fn transport_error(message: impl Into<String>) -> StreamError {
        StreamError::Transport { message: message.into(), status: None, partial: None }
    }

    /// Create protocol error
    pub fn protocol_error(message: impl Into<String>) -> StreamError {
        StreamError::Protocol { message: message.into(), partial: None }
    }

    /// Create authentication error
    pub fn auth_error(message: impl Into<String>) -> StreamError {
        StreamError::Auth { message: message.into(), partial: None }
    }
}

/// Error context extension trait
pub trait ErrorContext<T> {
    /// Add configuration error context
    fn config_context(self, message: &str) -> StreamResult<T>;

    /// Add transport error context
    fn transport_context(self, message: &str) -> StreamResult<T>;

    /// Add protocol error context
    fn protocol_context(self, message: &str) -> StreamResult<T>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn config_context(self, message: &str) -> StreamResult<T> {
        self.map_err(|e| helpers::config_error(format!("{}: {}", message, e)))
    }

    fn transport_context(self, message: &str) -> StreamResult<T> {
        self.map_err(|e| helpers::transport_error(format!("{}: {}", message, e)))
    }

    fn protocol_context(self, message: &str) -> StreamResult<T> {
        self.map_err(|e| helpers::protocol_error(format!("{}: {}", message, e)))
    }
}
