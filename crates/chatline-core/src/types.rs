// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the parser, transports, and the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Metadata key carrying the checkout side signal.
pub const CHECKOUT_URL_KEY: &str = "checkout_url";

/// Author of a conversation turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    User,
    Agent,
    System,
}

/// One turn in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique within a conversation, stable across deltas of one turn.
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// Creation time of the turn, not of each delta.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Message {
    /// Creates a message with a freshly generated id.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self::with_id(new_turn_id(), role, content)
    }

    /// Creates a message with an explicit id.
    pub fn with_id(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            intent: None,
            metadata: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Returns `metadata.checkout_url` when it is present as a string.
    pub fn checkout_url(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(CHECKOUT_URL_KEY))
            .and_then(Value::as_str)
    }
}

/// Generates a fresh turn id.
pub fn new_turn_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Discriminant of a [`StreamChunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChunkKind {
    Thinking,
    Intent,
    Action,
    Tool,
    Content,
    Done,
    Error,
}

/// A wire-level delta of an agent turn.
///
/// The incremental text arrives under either `content` or `chunk`,
/// depending on the producer; [`StreamChunk::delta`] hides the difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(rename = "type")]
    pub kind: ChunkKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl StreamChunk {
    pub fn new(kind: ChunkKind) -> Self {
        Self {
            kind,
            content: None,
            chunk: None,
            metadata: None,
        }
    }

    /// A `content` chunk carrying `text`.
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::new(ChunkKind::Content)
        }
    }

    /// The `done` terminal marker.
    pub fn done() -> Self {
        Self::new(ChunkKind::Done)
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// The incremental text payload, preferring `content` over `chunk`.
    pub fn delta(&self) -> Option<&str> {
        self.content.as_deref().or(self.chunk.as_deref())
    }

    /// Whether this chunk ends the turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, ChunkKind::Done | ChunkKind::Error)
    }
}

/// Lifecycle phase of the persistent channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ChannelPhase {
    Closed,
    Connecting,
    Open,
    /// Reconnect attempts exhausted; no further attempts are made.
    Disconnected,
    /// Torn down by the owner.
    Destroyed,
}

/// Observable state of the persistent channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelState {
    pub phase: ChannelPhase,
    /// True only between a successful open and close/error.
    pub connected: bool,
    /// True between an agent "typing started" signal and the next agent
    /// message or explicit "typing stopped".
    pub typing: bool,
    /// Reset to 0 on every successful open.
    pub reconnect_attempt: u32,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            phase: ChannelPhase::Closed,
            connected: false,
            typing: false,
            reconnect_attempt: 0,
        }
    }
}

impl ChannelState {
    /// Whether the channel will never open again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.phase,
            ChannelPhase::Disconnected | ChannelPhase::Destroyed
        )
    }
}

/// A conversation as returned by the bootstrap endpoint.
///
/// Owned by the caller; the pipeline only needs `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(default)]
    pub hesitation_signals: Option<Value>,
}
