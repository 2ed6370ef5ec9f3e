//! OpenAI API data models
//!
//! Chat completion request body and the streaming chunk shape shared by
//! OpenAI-compatible servers

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Streaming chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model name
    pub model: String,
    /// Message list, system instruction first when present
    pub messages: Vec<ChatMessage>,
    /// Always true for this client
    pub stream: bool,
    /// Usage reporting options
    pub stream_options: StreamOptions,
}

/// OpenAI message structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role (system/user/assistant)
    pub role: String,
    /// Message content
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self { role: role.to_string(), content: content.into() }
    }
}

/// Streaming options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamOptions {
    /// Ask the server to append a usage chunk at the end of the stream
    pub include_usage: bool,
}

/// One streamed chunk (`chat.completion.chunk`)
///
/// Every field is optional so keep-alive and usage-only chunks decode too.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// OpenAI streaming choice
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// OpenAI streaming delta
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// OpenAI usage statistics
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
    #[serde(default)]
    pub total_tokens: Option<u32>,
}

/// OpenAI error response
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: Value,
}

impl ChatCompletionChunk {
    /// First textual delta of the chunk, if any
    pub fn delta_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.as_ref())
            .and_then(|d| d.content.as_deref())
    }

    /// Total tokens from a usage block, if present
    pub fn total_tokens(&self) -> Option<u32> {
        self.usage.as_ref().and_then(|u| {
            u.total_tokens.or(match (u.prompt_tokens, u.completion_tokens) {
                (Some(p), Some(c)) => Some(p.saturating_add(c)),
                _ => None,
            })
        })
    }
}

/// Render an `error` member (object or string) as a single line
///
/// Object errors keep their `code`/`status` so callers can classify them.
pub fn describe_error(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            let message = map
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            let code = map
                .get("code")
                .or_else(|| map.get("status"))
                .filter(|c| !c.is_null())
                .map(|c| match c {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                });
            match code {
                Some(code) => format!("{}: {}", code, message),
                None => message,
            }
        }
        other => other.to_string(),
    }
}
