// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Chatline configuration system.

use chatline_config::diagnostic::ConfigError;
use chatline_config::model::{ChatlineConfig, ConcurrentSends};
use chatline_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_chatline_config() {
    let toml = r#"
[endpoint]
base_url = "https://agents.example/api/v1"
ws_url = "wss://agents.example/api/v1"

[session]
session_id = "sess-1"
organization_id = "org-1"
conversation_id = "conv-1"
streaming = false

[channel]
heartbeat_interval_secs = 15
reconnect_delay_ms = 500
reconnect_max_delay_ms = 8000
reconnect_multiplier = 1.5
max_reconnect_attempts = 4

[transport]
chunk_timeout_secs = 30
connect_timeout_secs = 5

[pipeline]
concurrent_sends = "reject"
error_message = "Something went wrong."

[log]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.endpoint.base_url, "https://agents.example/api/v1");
    assert_eq!(config.endpoint.resolved_ws_url(), "wss://agents.example/api/v1");
    assert_eq!(config.session.session_id.as_deref(), Some("sess-1"));
    assert_eq!(config.session.organization_id.as_deref(), Some("org-1"));
    assert_eq!(config.session.conversation_id.as_deref(), Some("conv-1"));
    assert!(!config.session.streaming);
    assert_eq!(config.channel.heartbeat_interval_secs, 15);
    assert_eq!(config.channel.reconnect_delay_ms, 500);
    assert_eq!(config.channel.reconnect_max_delay_ms, 8000);
    assert_eq!(config.channel.reconnect_multiplier, 1.5);
    assert_eq!(config.channel.max_reconnect_attempts, Some(4));
    assert_eq!(config.transport.chunk_timeout_secs, 30);
    assert_eq!(config.transport.connect_timeout_secs, 5);
    assert_eq!(config.pipeline.concurrent_sends, ConcurrentSends::Reject);
    assert_eq!(config.pipeline.error_message, "Something went wrong.");
    assert_eq!(config.log.level, "debug");
}

/// An empty document yields the documented defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML is valid");
    assert!(config.session.streaming);
    assert_eq!(config.channel.heartbeat_interval_secs, 30);
    assert_eq!(config.channel.reconnect_delay_ms, 3_000);
    assert_eq!(config.channel.max_reconnect_attempts, Some(10));
    assert_eq!(config.transport.chunk_timeout_secs, 60);
    assert_eq!(config.pipeline.concurrent_sends, ConcurrentSends::Queue);
    assert_eq!(
        config.pipeline.error_message,
        "Sorry, I encountered an error. Please try again."
    );
}

/// The channel URL is derived from the HTTP base when not set explicitly.
#[test]
fn ws_url_is_derived_from_base_url() {
    let config = load_config_from_str(
        r#"
[endpoint]
base_url = "https://agents.example/api/v1/"
"#,
    )
    .unwrap();
    assert_eq!(config.endpoint.resolved_ws_url(), "wss://agents.example/api/v1");

    let plain = ChatlineConfig::default();
    assert_eq!(plain.endpoint.resolved_ws_url(), "ws://localhost:8000/api/v1");
}

/// Unknown field in [session] produces an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_field_in_session_suggests_correction() {
    let toml = r#"
[session]
straeming = true
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion: Some(s), .. }
                if key == "straeming" && s == "streaming"
        )
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

/// Unknown top-level section is rejected.
#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[telemetry]
enabled = true
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// Wrong value type produces an InvalidType diagnostic.
#[test]
fn wrong_type_produces_invalid_type() {
    let toml = r#"
[channel]
heartbeat_interval_secs = "often"
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject wrong type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("heartbeat_interval_secs"))),
        "got: {errors:?}"
    );
}

/// Well-formed but semantically invalid config is caught by validation.
#[test]
fn validation_runs_after_deserialization() {
    let toml = r#"
[endpoint]
base_url = "agents.example"
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("base_url")))
    );
}

/// Unknown concurrent send policy is rejected.
#[test]
fn unknown_concurrent_send_policy_is_rejected() {
    let toml = r#"
[pipeline]
concurrent_sends = "drop"
"#;
    assert!(load_config_from_str(toml).is_err());
}
