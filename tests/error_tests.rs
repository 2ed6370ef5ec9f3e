//! Error handling module tests

use chatstream::models::Payload;
use chatstream::utils::error::helpers::*;
use chatstream::utils::error::*;
use std::time::Duration;

fn partial(text: &str) -> Payload {
    Payload {
        endpoint: "http://localhost:4315/v1/chat/completions".to_string(),
        model: None,
        request_body: r#"{"messages":[],"stream":true}"#.to_string(),
        text: text.to_string(),
        total_tokens: 0,
    }
}

#[test]
fn test_error_types() {
    let test_cases = vec![
        (config_error("test"), "configuration_error"),
        (
            StreamError::ConnectTimeout { timeout: Duration::from_secs(1), partial: None },
            "connect_timeout_error",
        ),
        (
            StreamError::ReadTimeout { timeout: Duration::from_secs(1), partial: None },
            "read_timeout_error",
        ),
        (transport_error("test"), "transport_error"),
        (protocol_error("test"), "protocol_error"),
        (auth_error("test"), "authentication_error"),
        (StreamError::Cancelled { partial: None }, "cancelled"),
    ];

    for (error, expected_type) in test_cases {
        assert_eq!(error.error_type(), expected_type);
    }
}

#[test]
fn test_error_kind_display() {
    assert_eq!(ErrorKind::ConnectTimeout.to_string(), "connect_timeout");
    assert_eq!(ErrorKind::Auth.to_string(), "auth");
    assert_eq!(
        serde_json::to_string(&ErrorKind::ReadTimeout).unwrap(),
        r#""read_timeout""#
    );
}

#[test]
fn test_error_display() {
    assert_eq!(config_error("Model is missing").to_string(), "Configuration error: Model is missing");
    assert_eq!(auth_error("bad key").to_string(), "Authentication failed: bad key");
    assert_eq!(
        StreamError::Cancelled { partial: None }.to_string(),
        "Cancelled by host shutdown"
    );
}

#[test]
fn test_partial_survives_every_runtime_kind() {
    let errors = vec![
        StreamError::ConnectTimeout { timeout: Duration::from_secs(60), partial: None },
        StreamError::ReadTimeout { timeout: Duration::from_secs(60), partial: None },
        transport_error("reset"),
        protocol_error("garbage"),
        auth_error("denied"),
        StreamError::Cancelled { partial: None },
    ];

    for error in errors {
        let kind = error.kind();
        let error = error.with_partial(partial("so far"));
        assert_eq!(error.kind(), kind);
        assert_eq!(error.partial().unwrap().text, "so far", "{}", kind);
    }
}

#[test]
fn test_credential_invalidation_kinds() {
    assert!(auth_error("x").invalidates_local_credentials());
    assert!(transport_error("x").invalidates_local_credentials());
    assert!(!protocol_error("x").invalidates_local_credentials());
    assert!(!StreamError::ReadTimeout { timeout: Duration::from_secs(1), partial: None }
        .invalidates_local_credentials());
    assert!(!StreamError::Cancelled { partial: None }.invalidates_local_credentials());
}

#[test]
fn test_logging_policy() {
    assert!(transport_error("x").should_log_details());
    assert!(!auth_error("x").should_log_details());
    assert!(!StreamError::Cancelled { partial: None }.should_log_details());
}

#[test]
fn test_status_mapping() {
    assert_eq!(StreamError::from_status(403, "").kind(), ErrorKind::Auth);
    assert_eq!(StreamError::from_status(429, "slow down").kind(), ErrorKind::Transport);

    let err = StreamError::from_status(500, "");
    assert_eq!(err.to_string(), "Transport error: HTTP 500");
    assert_eq!(err.status(), Some(500));
}

#[test]
fn test_error_context_trait() {
    let parse: Result<u32, std::num::ParseIntError> = "x".parse();
    let err = parse.config_context("Invalid timeout").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().starts_with("Configuration error: Invalid timeout"));

    let json: Result<serde_json::Value, _> = serde_json::from_str("{");
    let err = json.protocol_context("Bad frame").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
}
