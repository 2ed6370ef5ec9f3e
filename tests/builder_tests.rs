//! Request builder tests

use chatstream::models::Message;
use chatstream::providers::{gemini, openai, player2, Protocol, Provider};
use chatstream::utils::error::ErrorKind;
use chatstream::Settings;
use serde_json::{json, Value};

fn conversation() -> Vec<Message> {
    vec![
        Message::user("Who are you?"),
        Message::assistant("A colonist."),
        Message::user("What do you do?"),
    ]
}

fn body(provider: &dyn Provider, instruction: &str, messages: &[Message], model: &str) -> Value {
    let raw = provider.build_request(instruction, messages, model).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn test_openai_body_preserves_order() {
    let provider = Protocol::OpenAi.provider(&Settings::default());
    let value = body(provider.as_ref(), "Stay brief", &conversation(), "gpt-4o-mini");

    assert_eq!(
        value,
        json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": "Stay brief"},
                {"role": "user", "content": "Who are you?"},
                {"role": "assistant", "content": "A colonist."},
                {"role": "user", "content": "What do you do?"}
            ],
            "stream": true,
            "stream_options": {"include_usage": true}
        })
    );
}

#[test]
fn test_openai_requires_model() {
    let err = openai::build_request("", &conversation(), " ").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_gemini_body() {
    let provider = Protocol::Gemini.provider(&Settings::default());
    let value = body(provider.as_ref(), "Stay brief", &conversation(), "gemini-2.5-pro");

    assert_eq!(value["system_instruction"], json!({"parts": [{"text": "Stay brief"}]}));
    let roles: Vec<&str> = value["contents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["user", "model", "user"]);
    // always present, empty for non-flash models
    assert_eq!(value["generation_config"], json!({}));
}

#[test]
fn test_gemini_flash_thinking_budget() {
    let provider = Protocol::Gemini.provider(&Settings::default());
    let value = body(provider.as_ref(), "", &conversation(), "gemini-2.5-flash-lite");

    assert!(value.get("system_instruction").is_none());
    assert_eq!(
        value["generation_config"],
        json!({"thinking_config": {"thinking_budget": 0}})
    );
}

#[test]
fn test_gemma_instruction_becomes_first_user_turn() {
    let request = gemini::build_request("Play a miner", &conversation(), "gemma-3-27b-it").unwrap();

    assert!(request.system_instruction.is_none());
    assert_eq!(request.contents.len(), 4);

    let first = &request.contents[0];
    assert_eq!(first.role.as_deref(), Some("user"));
    let text = first.parts[0].text.as_deref().unwrap();
    let (nonce, rest) = text.split_once(' ').unwrap();
    assert!(nonce.parse::<u32>().is_ok(), "nonce should be numeric: {}", nonce);
    assert_eq!(rest, "Play a miner");

    assert_eq!(request.contents[1].parts[0].text.as_deref(), Some("Who are you?"));
}

#[test]
fn test_player2_merges_same_role_turns() {
    let request = player2::build_request(
        "",
        &[Message::user("a"), Message::user("b"), Message::assistant("c")],
    )
    .unwrap();

    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(
        value,
        json!({
            "messages": [
                {"role": "user", "content": "a\n\nb"},
                {"role": "assistant", "content": "c"}
            ],
            "stream": true
        })
    );
}

#[test]
fn test_player2_body_has_no_model() {
    let provider = Protocol::Player2.provider(&Settings::default());
    let value = body(provider.as_ref(), "Be kind", &[Message::user("hi")], "ignored");
    assert!(value.get("model").is_none());
    assert_eq!(value["messages"][0], json!({"role": "system", "content": "Be kind"}));
    assert_eq!(provider.payload_model("ignored"), None);
}

#[test]
fn test_empty_messages_rejected_by_every_protocol() {
    let settings = Settings::default();
    for protocol in [Protocol::OpenAi, Protocol::Gemini, Protocol::Player2] {
        let err = protocol
            .provider(&settings)
            .build_request("x", &[], "model")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration, "{}", protocol);
    }
}

#[test]
fn test_endpoints() {
    let settings = Settings::default();

    let openai = Protocol::OpenAi.provider(&settings);
    assert_eq!(
        openai.endpoint("http://192.168.1.5:1234", "m", "k").unwrap().url,
        "http://192.168.1.5:1234/v1/chat/completions"
    );

    let gemini = Protocol::Gemini.provider(&settings);
    let endpoint = gemini
        .endpoint("https://example.test/v1beta/", "gemini-2.5-pro", "secret")
        .unwrap();
    assert_eq!(
        endpoint.url,
        "https://example.test/v1beta/models/gemini-2.5-pro:streamGenerateContent?alt=sse&key=secret"
    );
    assert!(!endpoint.display.contains("secret"));
    assert!(!gemini.uses_bearer_auth());
}
