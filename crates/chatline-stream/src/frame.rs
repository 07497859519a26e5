// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON frames exchanged over the persistent channel.
//!
//! Server -> client:
//! ```json
//! {"type": "connected", "conversation_id": "c-1"}
//! {"type": "user_message", "message": {...}}
//! {"type": "agent_message", "chunk": {"type": "content", "content": "partial..."}}
//! {"type": "agent_message", "message": {"id": "...", "role": "agent", "content": "full"}}
//! {"type": "typing", "is_typing": true}
//! {"type": "pong"}
//! {"type": "error", "message": "..."}
//! ```
//!
//! Client -> server:
//! ```json
//! {"type": "message", "content": "price?", "context": {...}}
//! {"type": "typing", "is_typing": true}
//! {"type": "ping"}
//! ```

use chatline_core::{ChatError, Message, StreamChunk};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A frame received from the agent backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// Connection acknowledgment.
    Connected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conversation_id: Option<String>,
    },
    /// Echo of the caller's own message.
    UserMessage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<Value>,
    },
    /// A delta or a complete agent message.
    AgentMessage(AgentPayload),
    /// Agent typing state change.
    Typing {
        #[serde(default)]
        is_typing: bool,
    },
    /// Heartbeat reply.
    Pong,
    /// Backend-reported error. The channel stays open.
    Error {
        #[serde(default, alias = "error", skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

/// Body of an `agent_message` frame: either one chunk or a whole message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<StreamChunk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

/// A frame sent to the agent backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// A user-authored message.
    Message {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<Value>,
    },
    /// The visitor started or stopped typing.
    Typing { is_typing: bool },
    /// Heartbeat.
    Ping,
}

impl OutboundFrame {
    /// Encodes the frame as JSON text.
    pub fn to_text(&self) -> Result<String, ChatError> {
        serde_json::to_string(self)
            .map_err(|e| ChatError::Internal(format!("failed to encode frame: {e}")))
    }
}
