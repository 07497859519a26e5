// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Chatline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Chatline configuration.
///
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatlineConfig {
    /// Agent backend endpoints.
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Widget session identity and transport preference.
    #[serde(default)]
    pub session: SessionConfig,

    /// Persistent channel heartbeat and reconnect policy.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Request/response fallback transport settings.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Message pipeline behavior.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Agent backend endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    /// HTTP base URL of the agent API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// WebSocket base URL. Derived from `base_url` when unset.
    #[serde(default)]
    pub ws_url: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: None,
        }
    }
}

impl EndpointConfig {
    /// The WebSocket base URL, either explicit or derived by swapping the
    /// `http(s)` scheme of `base_url` for `ws(s)`.
    pub fn resolved_ws_url(&self) -> String {
        if let Some(ws) = &self.ws_url {
            return ws.trim_end_matches('/').to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

/// Widget session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Visitor session id sent to the conversation bootstrap endpoint.
    #[serde(default)]
    pub session_id: Option<String>,

    /// Organization owning the widget.
    #[serde(default)]
    pub organization_id: Option<String>,

    /// Resume an existing conversation instead of creating one.
    #[serde(default)]
    pub conversation_id: Option<String>,

    /// Stream agent responses. When false the non-streamed fallback
    /// endpoint is used and the channel is never opened.
    #[serde(default = "default_true")]
    pub streaming: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: None,
            organization_id: None,
            conversation_id: None,
            streaming: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Persistent channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    /// Seconds between heartbeat pings.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Delay before the first reconnect attempt, in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Upper bound for the reconnect delay, in milliseconds.
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,

    /// Growth factor applied to the delay after each failed attempt.
    /// `1.0` keeps the delay fixed.
    #[serde(default = "default_reconnect_multiplier")]
    pub reconnect_multiplier: f64,

    /// Consecutive reconnect attempts before giving up. `None` retries forever.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            reconnect_multiplier: default_reconnect_multiplier(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

impl ChannelConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_delay_ms)
    }
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_reconnect_delay_ms() -> u64 {
    3_000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000
}

fn default_reconnect_multiplier() -> f64 {
    2.0
}

fn default_max_reconnect_attempts() -> Option<u32> {
    Some(10)
}

/// Fallback transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Longest silence tolerated between two chunks of one turn, in seconds.
    #[serde(default = "default_chunk_timeout_secs")]
    pub chunk_timeout_secs: u64,

    /// TCP/TLS connect timeout for HTTP requests, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            chunk_timeout_secs: default_chunk_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl TransportConfig {
    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_chunk_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// What to do with a send issued while another turn is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrentSends {
    /// Wait for the in-flight turn to finish.
    #[default]
    Queue,
    /// Record the user message but do not start a turn.
    Reject,
}

/// Message pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub concurrent_sends: ConcurrentSends,

    /// Content of the agent message shown when a turn fails.
    #[serde(default = "default_error_message")]
    pub error_message: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrent_sends: ConcurrentSends::default(),
            error_message: default_error_message(),
        }
    }
}

fn default_error_message() -> String {
    "Sorry, I encountered an error. Please try again.".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
