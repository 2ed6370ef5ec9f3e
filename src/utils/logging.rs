//! Logging utilities
//!
//! Shared logging configuration and helper functions

use serde_json::Value;

/// Set to true to include full request bodies (instructions, long turns) in debug logs
/// Default is false to reduce log verbosity
pub const VERBOSE_REQUEST_LOGGING: bool = false;

/// Longest string kept verbatim in a log summary
const MAX_LOGGED_TEXT: usize = 200;

/// Truncate a string with a note about original length
pub fn truncate_content(s: &str, max_len: usize) -> String {
    if s.len() > max_len {
        let mut cut = max_len;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... ({} chars truncated)", &s[..cut], s.len() - cut)
    } else {
        s.to_string()
    }
}

fn truncate_strings(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(truncate_content(&s, MAX_LOGGED_TEXT)),
        Value::Array(items) => Value::Array(items.into_iter().map(truncate_strings).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, truncate_strings(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Create a filtered summary of a JSON request body for logging
/// Keeps original structure but truncates verbose content
pub fn request_log_summary(body: &str) -> String {
    if VERBOSE_REQUEST_LOGGING {
        return body.to_string();
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value) => truncate_strings(value).to_string(),
        Err(_) => truncate_content(body, MAX_LOGGED_TEXT),
    }
}

/// Mask all but the last four characters of a credential
pub fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_content() {
        assert_eq!(truncate_content("short", 10), "short");
        assert_eq!(truncate_content("abcdefghij", 4), "abcd... (6 chars truncated)");
        // never splits a multi-byte character
        let s = "ééé";
        assert!(truncate_content(s, 3).starts_with('é'));
    }

    #[test]
    fn test_request_log_summary_truncates_nested_text() {
        let long = "x".repeat(500);
        let body = serde_json::json!({"messages": [{"role": "user", "content": long}]}).to_string();
        let summary = request_log_summary(&body);
        assert!(summary.contains("chars truncated"));
        assert!(summary.len() < body.len());
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-123456"), "*****3456");
        assert_eq!(mask_key("abc"), "***");
    }
}
