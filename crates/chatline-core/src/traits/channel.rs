// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent bidirectional channel trait.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::ChatError;
use crate::traits::transport::ChunkStream;
use crate::types::ChannelState;

/// A persistent channel to the agent backend, one per conversation.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Opens the channel for a conversation. No-op while already open or
    /// connecting.
    async fn open(&self, conversation_id: &str) -> Result<(), ChatError>;

    /// Current state snapshot.
    fn state(&self) -> ChannelState;

    /// Receiver that observes every state change.
    fn subscribe(&self) -> watch::Receiver<ChannelState>;

    fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Sends a user message and returns the agent chunks answering it.
    ///
    /// Fails with [`ChatError::NotConnected`] when the channel is not open.
    async fn open_turn(&self, text: &str, context: Option<Value>)
    -> Result<ChunkStream, ChatError>;

    /// Tears the channel down for good, cancelling heartbeat and reconnect.
    async fn close(&self);
}
