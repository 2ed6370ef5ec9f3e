//! OpenAI Provider implementation
//!
//! Standard OpenAI-compatible API provider

use super::parser::{Frame, FrameDecoder};
use super::{sse_data, Endpoint, Provider};
use crate::models::openai::*;
use crate::models::{Message, Role};
use crate::utils::error::{helpers::config_error, ErrorContext, StreamResult};
use crate::utils::logging::truncate_content;
use reqwest::Url;

/// Path appended when the configured base URL has none
pub const DEFAULT_CHAT_PATH: &str = "/v1/chat/completions";

/// OpenAI Provider
pub struct OpenAIProvider;

/// Build the request URL
///
/// The chat path is appended only when the base URL has no path of its own,
/// so fully qualified endpoints are used as given.
pub fn format_endpoint_url(base_url: &str) -> StreamResult<String> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(config_error("Endpoint URL is missing"));
    }

    let url = Url::parse(trimmed).config_context("Invalid endpoint URL")?;
    if url.path().trim_matches('/').is_empty() {
        Ok(format!("{}{}", trimmed, DEFAULT_CHAT_PATH))
    } else {
        Ok(trimmed.to_string())
    }
}

pub(crate) fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Build the streaming chat completion request
pub fn build_request(
    instruction: &str,
    messages: &[Message],
    model: &str,
) -> StreamResult<ChatCompletionRequest> {
    if model.trim().is_empty() {
        return Err(config_error("Model is missing"));
    }
    if messages.is_empty() {
        return Err(config_error("At least one message is required"));
    }

    let mut all_messages = Vec::with_capacity(messages.len() + 1);
    if !instruction.is_empty() {
        all_messages.push(ChatMessage::new("system", instruction));
    }
    all_messages.extend(
        messages
            .iter()
            .map(|m| ChatMessage::new(role_name(m.role), m.text.clone())),
    );

    Ok(ChatCompletionRequest {
        model: model.to_string(),
        messages: all_messages,
        stream: true,
        stream_options: StreamOptions { include_usage: true },
    })
}

/// Decode one `data:` payload in the chat completion chunk format
pub(crate) fn decode_chat_chunk(data: &str) -> Frame {
    let data = data.trim();
    if data.is_empty() {
        return Frame::Ignored;
    }
    if data == "[DONE]" {
        return Frame::Done;
    }

    match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(chunk) => match &chunk.error {
            Some(error) => Frame::Error(describe_error(error)),
            None => Frame::Data {
                delta: chunk.delta_text().map(str::to_string),
                total_tokens: chunk.total_tokens(),
            },
        },
        Err(e) => Frame::Malformed(format!("{} - data: {}", e, truncate_content(data, 100))),
    }
}

/// SSE decoder for chat completion streams
#[derive(Debug, Default)]
pub struct OpenAIDecoder;

impl FrameDecoder for OpenAIDecoder {
    fn decode(&mut self, line: &str) -> Frame {
        match sse_data(line) {
            Some(data) => decode_chat_chunk(data),
            None => Frame::Ignored,
        }
    }
}

impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn endpoint(&self, base_url: &str, _model: &str, _api_key: &str) -> StreamResult<Endpoint> {
        format_endpoint_url(base_url).map(Endpoint::plain)
    }

    fn build_request(
        &self,
        instruction: &str,
        messages: &[Message],
        model: &str,
    ) -> StreamResult<String> {
        let request = build_request(instruction, messages, model)?;
        serde_json::to_string(&request).protocol_context("Failed to serialize request")
    }

    fn decoder(&self) -> Box<dyn FrameDecoder> {
        Box::new(OpenAIDecoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_endpoint_url() {
        assert_eq!(
            format_endpoint_url("https://api.openai.com").unwrap(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            format_endpoint_url("http://localhost:11434/").unwrap(),
            "http://localhost:11434/v1/chat/completions"
        );
        // existing path is kept as-is
        assert_eq!(
            format_endpoint_url("https://openrouter.ai/api/v1/chat/completions/").unwrap(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert!(format_endpoint_url("  ").is_err());
        assert!(format_endpoint_url("not a url").is_err());
    }

    #[test]
    fn test_build_request_prepends_instruction() {
        let request = build_request(
            "Be brief",
            &[Message::user("Hi"), Message::assistant("Hello")],
            "gpt-4o",
        )
        .unwrap();

        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0], ChatMessage::new("system", "Be brief"));
        assert_eq!(request.messages[1].role, "user");
        assert_eq!(request.messages[2].role, "assistant");
        assert!(request.stream);
        assert!(request.stream_options.include_usage);
    }

    #[test]
    fn test_build_request_without_instruction() {
        let request = build_request("", &[Message::user("Hi")], "gpt-4o").unwrap();
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
    }

    #[test]
    fn test_decoder() {
        let mut decoder = OpenAIDecoder;
        assert_eq!(
            decoder.decode(r#"data: {"choices":[{"index":0,"delta":{"content":"Hello"}}]}"#),
            Frame::Data { delta: Some("Hello".to_string()), total_tokens: None }
        );
        assert_eq!(decoder.decode("data: [DONE]"), Frame::Done);
        assert_eq!(decoder.decode(": keep-alive"), Frame::Ignored);
        assert!(matches!(decoder.decode("data: {oops"), Frame::Malformed(_)));
    }
}
