//! Player2 API data models
//!
//! Chat requests reuse the OpenAI message shape; the streamed lines use the
//! OpenAI chunk shape without SSE framing.

use super::openai::ChatMessage;
use serde::{Deserialize, Serialize};

/// Player2 chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player2Request {
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// Response of the local app's web login endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalLoginResponse {
    #[serde(rename = "p2Key", default)]
    pub p2_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response() {
        let resp: LocalLoginResponse = serde_json::from_str(r#"{"p2Key":"abc"}"#).unwrap();
        assert_eq!(resp.p2_key.as_deref(), Some("abc"));

        let empty: LocalLoginResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.p2_key.is_none());
    }
}
