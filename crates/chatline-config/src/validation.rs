// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as URL schemes, non-zero intervals, and backoff parameters.

use crate::diagnostic::ConfigError;
use crate::model::ChatlineConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ChatlineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let base = config.endpoint.base_url.trim();
    if base.is_empty() {
        errors.push(ConfigError::Validation {
            message: "endpoint.base_url must not be empty".to_string(),
        });
    } else if !(base.starts_with("http://") || base.starts_with("https://")) {
        errors.push(ConfigError::Validation {
            message: format!("endpoint.base_url `{base}` must start with http:// or https://"),
        });
    }

    if let Some(ws) = &config.endpoint.ws_url {
        let ws = ws.trim();
        if !(ws.starts_with("ws://") || ws.starts_with("wss://")) {
            errors.push(ConfigError::Validation {
                message: format!("endpoint.ws_url `{ws}` must start with ws:// or wss://"),
            });
        }
    }

    if config.channel.heartbeat_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "channel.heartbeat_interval_secs must be at least 1".to_string(),
        });
    }

    if config.channel.reconnect_multiplier < 1.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "channel.reconnect_multiplier must be at least 1.0, got {}",
                config.channel.reconnect_multiplier
            ),
        });
    }

    if config.channel.reconnect_max_delay_ms < config.channel.reconnect_delay_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "channel.reconnect_max_delay_ms ({}) must not be below channel.reconnect_delay_ms ({})",
                config.channel.reconnect_max_delay_ms, config.channel.reconnect_delay_ms
            ),
        });
    }

    if config.transport.chunk_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "transport.chunk_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.pipeline.error_message.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "pipeline.error_message must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
