//! Data models module
//!
//! Caller-facing conversation types, the result payload, and the wire
//! structures for each supported protocol

use serde::{Deserialize, Serialize};

pub mod gemini;
pub mod openai;
pub mod player2;

/// Conversation role of a caller-supplied message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self { role, text: text.into() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// Result of one streaming call
///
/// Carries enough of the outgoing request to replay it for diagnostics.
/// On failure the same structure is attached to the error with whatever
/// text had been streamed before the call stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Endpoint the request was sent to (API keys in the query string are stripped)
    pub endpoint: String,
    /// Model identifier, if the protocol sends one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Exact JSON body that was sent
    pub request_body: String,
    /// Accumulated generated text
    pub text: String,
    /// Total token count reported by the backend (0 when not reported)
    pub total_tokens: u32,
}

impl Payload {
    /// Whether any generated text was received
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::user("hi"), Message { role: Role::User, text: "hi".to_string() });
        assert_eq!(Message::assistant("yo").role, Role::Assistant);
    }

    #[test]
    fn test_payload_serialization_skips_missing_model() {
        let payload = Payload {
            endpoint: "http://localhost:4315/v1/chat/completions".to_string(),
            model: None,
            request_body: "{}".to_string(),
            text: "hello".to_string(),
            total_tokens: 3,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("model").is_none());
        assert_eq!(json["total_tokens"], 3);
        assert!(payload.has_text());
    }
}
