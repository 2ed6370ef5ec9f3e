//! Gemini API data models

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `streamGenerateContent` request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    pub contents: Vec<GeminiContent>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInstruction {
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

impl GeminiContent {
    pub fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![GeminiPart { text: Some(text.into()) }],
        }
    }
}

/// Text part; non-text parts decode with `text: None`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingConfig {
    pub thinking_budget: i32,
}

/// One SSE event of a streamed response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiStreamResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata", default)]
    pub usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(rename = "finishReason", default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiUsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    pub prompt_token_count: Option<u32>,
    #[serde(rename = "candidatesTokenCount", default)]
    pub candidates_token_count: Option<u32>,
    #[serde(rename = "totalTokenCount", default)]
    pub total_token_count: Option<u32>,
}

impl GeminiStreamResponse {
    /// First text part of the first candidate
    pub fn delta_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|content| content.parts.iter().find_map(|p| p.text.as_deref()))
    }

    pub fn total_tokens(&self) -> Option<u32> {
        self.usage_metadata.as_ref().and_then(|u| u.total_token_count)
    }
}
