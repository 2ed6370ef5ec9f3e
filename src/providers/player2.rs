//! Player2 Provider implementation
//!
//! OpenAI-style chat completions served either by the local Player2 app or by
//! the hosted API. Streamed lines are bare JSON objects.

use super::openai::{decode_chat_chunk, role_name};
use super::parser::{Frame, FrameDecoder};
use super::{sse_data, Endpoint, Provider};
use crate::models::openai::ChatMessage;
use crate::models::player2::Player2Request;
use crate::models::Message;
use crate::utils::error::{helpers::config_error, ErrorContext, StreamResult};
use reqwest::Url;

/// Header identifying the calling game/client
pub const GAME_KEY_HEADER: &str = "player2-game-key";

/// Player2 Provider
pub struct Player2Provider {
    client_id: String,
}

impl Player2Provider {
    pub fn new(client_id: &str) -> Self {
        Self { client_id: client_id.to_string() }
    }
}

/// Build the request body
///
/// Consecutive turns with the same role are merged with a blank line between
/// them; the API rejects repeated same-role turns.
pub fn build_request(instruction: &str, messages: &[Message]) -> StreamResult<Player2Request> {
    if messages.is_empty() {
        return Err(config_error("At least one message is required"));
    }

    let mut all_messages: Vec<ChatMessage> = Vec::with_capacity(messages.len() + 1);
    if !instruction.is_empty() {
        all_messages.push(ChatMessage::new("system", instruction));
    }

    for m in messages {
        let role = role_name(m.role);
        match all_messages.last_mut() {
            Some(last) if last.role == role => {
                last.content.push_str("\n\n");
                last.content.push_str(&m.text);
            }
            _ => all_messages.push(ChatMessage::new(role, m.text.clone())),
        }
    }

    Ok(Player2Request { messages: all_messages, stream: true })
}

/// Newline-delimited JSON decoder; a stray `data:` prefix is tolerated
#[derive(Debug, Default)]
pub struct Player2Decoder;

impl FrameDecoder for Player2Decoder {
    fn decode(&mut self, line: &str) -> Frame {
        decode_chat_chunk(sse_data(line).unwrap_or(line))
    }
}

impl Provider for Player2Provider {
    fn name(&self) -> &str {
        "player2"
    }

    fn endpoint(&self, base_url: &str, _model: &str, _api_key: &str) -> StreamResult<Endpoint> {
        let base = base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(config_error("Player2 base URL is missing"));
        }
        Url::parse(base).config_context("Invalid Player2 base URL")?;
        Ok(Endpoint::plain(format!("{}/v1/chat/completions", base)))
    }

    fn build_request(
        &self,
        instruction: &str,
        messages: &[Message],
        _model: &str,
    ) -> StreamResult<String> {
        let request = build_request(instruction, messages)?;
        serde_json::to_string(&request).protocol_context("Failed to serialize request")
    }

    fn decoder(&self) -> Box<dyn FrameDecoder> {
        Box::new(Player2Decoder)
    }

    fn default_headers(&self) -> Vec<(String, String)> {
        vec![(GAME_KEY_HEADER.to_string(), self.client_id.clone())]
    }

    fn payload_model(&self, _model: &str) -> Option<String> {
        None
    }
}
