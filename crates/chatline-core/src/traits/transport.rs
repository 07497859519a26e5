// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request/response transport trait used when the persistent channel is unusable.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use serde_json::Value;

use crate::error::ChatError;
use crate::types::{Message, StreamChunk};

/// Ordered chunks of one agent turn. Ends at the terminal marker or when
/// the underlying stream closes.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ChatError>> + Send>>;

/// A stateless request/response exchange per turn.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    /// Issues a streamed request and returns its decoded chunks.
    ///
    /// Fails with [`ChatError::Transport`] on a non-success status.
    async fn stream_turn(
        &self,
        conversation_id: &str,
        text: &str,
        context: Option<Value>,
    ) -> Result<ChunkStream, ChatError>;

    /// Issues a non-streamed request and returns the agent message directly.
    async fn complete_turn(
        &self,
        conversation_id: &str,
        text: &str,
        context: Option<Value>,
    ) -> Result<Message, ChatError>;
}
