//! Gemini Provider implementation
//!
//! Native `streamGenerateContent` API with SSE output (`alt=sse`).
//! The API key travels in the query string, never in a header.

use super::parser::{Frame, FrameDecoder};
use super::{sse_data, Endpoint, Provider};
use crate::models::gemini::*;
use crate::models::openai::describe_error;
use crate::models::{Message, Role};
use crate::utils::error::{helpers::config_error, ErrorContext, StreamResult};
use crate::utils::logging::truncate_content;
use reqwest::Url;

/// Base URL used when the configuration leaves it empty
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini Provider
pub struct GeminiProvider;

/// Build the streaming endpoint; `display` omits the key
pub fn build_endpoint(base_url: &str, model: &str, api_key: &str) -> StreamResult<Endpoint> {
    let base = match base_url.trim().trim_end_matches('/') {
        "" => DEFAULT_BASE_URL,
        other => other,
    };
    let mut url = Url::parse(base).config_context("Invalid Gemini base URL")?;
    if model.trim().is_empty() {
        return Err(config_error("Model is missing"));
    }
    if api_key.is_empty() {
        return Err(config_error("Gemini API key is missing"));
    }

    url.path_segments_mut()
        .map_err(|_| config_error(format!("Gemini base URL cannot carry a path: {}", base)))?
        .pop_if_empty()
        .push("models")
        .push(&format!("{}:streamGenerateContent", model.trim()));
    url.query_pairs_mut().append_pair("alt", "sse");

    let display = url.to_string();
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(Endpoint { url: url.into(), display })
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

/// Build the request body
///
/// Gemma models reject `system_instruction`; for them the instruction becomes
/// a leading user turn prefixed with a random number so identical prompts are
/// not served from a provider-side cache. Flash models get a zero thinking
/// budget.
pub fn build_request(
    instruction: &str,
    messages: &[Message],
    model: &str,
) -> StreamResult<GeminiRequest> {
    if model.trim().is_empty() {
        return Err(config_error("Model is missing"));
    }
    if messages.is_empty() {
        return Err(config_error("At least one message is required"));
    }

    let model_lower = model.to_ascii_lowercase();
    let mut system_instruction = None;
    let mut contents = Vec::with_capacity(messages.len() + 1);

    if !instruction.is_empty() {
        if model_lower.contains("gemma") {
            let nonce: u32 = rand::random();
            contents.push(GeminiContent::text("user", format!("{} {}", nonce, instruction)));
        } else {
            system_instruction = Some(SystemInstruction {
                parts: vec![GeminiPart { text: Some(instruction.to_string()) }],
            });
        }
    }

    contents.extend(
        messages
            .iter()
            .map(|m| GeminiContent::text(role_name(m.role), m.text.clone())),
    );

    let mut generation_config = GenerationConfig::default();
    if model_lower.contains("flash") {
        generation_config.thinking_config = Some(ThinkingConfig { thinking_budget: 0 });
    }

    Ok(GeminiRequest { system_instruction, contents, generation_config })
}

/// SSE decoder for Gemini streams
#[derive(Debug, Default)]
pub struct GeminiDecoder;

impl FrameDecoder for GeminiDecoder {
    fn decode(&mut self, line: &str) -> Frame {
        let Some(data) = sse_data(line).map(str::trim) else {
            return Frame::Ignored;
        };
        if data.is_empty() {
            return Frame::Ignored;
        }

        match serde_json::from_str::<GeminiStreamResponse>(data) {
            Ok(event) => match &event.error {
                Some(error) => Frame::Error(describe_error(error)),
                None => Frame::Data {
                    delta: event.delta_text().map(str::to_string),
                    total_tokens: event.total_tokens(),
                },
            },
            Err(e) => Frame::Malformed(format!("{} - data: {}", e, truncate_content(data, 100))),
        }
    }
}

impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn endpoint(&self, base_url: &str, model: &str, api_key: &str) -> StreamResult<Endpoint> {
        build_endpoint(base_url, model, api_key)
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
        Box::new(GeminiDecoder)
    }

    fn uses_bearer_auth(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_endpoint() {
        let endpoint = build_endpoint("", "gemini-2.5-flash", "k123").unwrap();
        assert_eq!(
            endpoint.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse&key=k123"
        );
        assert!(!endpoint.display.contains("k123"));

        assert!(build_endpoint("", "gemini-2.5-pro", "").is_err());
    }

    #[test]
    fn test_endpoint_encodes_key_and_model() {
        let endpoint = build_endpoint("https://example.test/v1beta", "tuned/v1 #2", "a&b#c=").unwrap();
        assert_eq!(
            endpoint.url,
            "https://example.test/v1beta/models/tuned%2Fv1%20%232:streamGenerateContent?alt=sse&key=a%26b%23c%3D"
        );
        assert_eq!(
            endpoint.display,
            "https://example.test/v1beta/models/tuned%2Fv1%20%232:streamGenerateContent?alt=sse"
        );

        let parsed = Url::parse(&endpoint.url).unwrap();
        let key = parsed.query_pairs().find(|(k, _)| k == "key").map(|(_, v)| v.into_owned());
        assert_eq!(key.as_deref(), Some("a&b#c="));
    }

    #[test]
    fn test_system_instruction_for_regular_models() {
        let request = build_request("Be terse", &[Message::user("Hi")], "gemini-2.5-pro").unwrap();
        let system = request.system_instruction.unwrap();
        assert_eq!(system.parts[0].text.as_deref(), Some("Be terse"));
        assert_eq!(request.contents.len(), 1);
        assert!(request.generation_config.thinking_config.is_none());
    }

    #[test]
    fn test_assistant_maps_to_model_role() {
        let request = build_request(
            "",
            &[Message::user("Hi"), Message::assistant("Hello")],
            "gemini-2.5-pro",
        )
        .unwrap();
        assert_eq!(request.contents[1].role.as_deref(), Some("model"));
    }

    #[test]
    fn test_flash_disables_thinking() {
        let request = build_request("x", &[Message::user("Hi")], "gemini-2.5-flash").unwrap();
        assert_eq!(request.generation_config.thinking_config.unwrap().thinking_budget, 0);
    }

    #[test]
    fn test_decoder_reads_usage_event() {
        let mut decoder = GeminiDecoder;
        assert_eq!(
            decoder.decode(r#"data: {"usageMetadata":{"totalTokenCount":42}}"#),
            Frame::Data { delta: None, total_tokens: Some(42) }
        );
    }
}
