// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock persistent channel for deterministic testing.
//!
//! `MockChannel` implements `ChatChannel` with scripted agent turns, a
//! connectivity switch, and captured outbound messages.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chatline_core::{ChannelPhase, ChannelState, ChatChannel, ChatError, ChunkStream};
use serde_json::Value;
use tokio::sync::{Mutex, watch};

use crate::script::Script;

/// A message the pipeline pushed through the channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub text: String,
    pub context: Option<Value>,
}

/// A mock channel for testing.
///
/// Turns are answered from a FIFO queue of scripts; an empty queue answers
/// with "mock response".
pub struct MockChannel {
    state: watch::Sender<ChannelState>,
    connect_on_open: bool,
    scripts: Arc<Mutex<VecDeque<Script>>>,
    sent: Arc<Mutex<Vec<SentMessage>>>,
    opened: Arc<Mutex<Vec<String>>>,
}

impl MockChannel {
    /// A channel that is closed and stays closed when opened.
    pub fn new() -> Self {
        Self {
            state: watch::channel(ChannelState::default()).0,
            connect_on_open: false,
            scripts: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A channel that becomes connected as soon as it is opened.
    pub fn connecting() -> Self {
        Self {
            connect_on_open: true,
            ..Self::new()
        }
    }

    /// Queue the answer to the next turn.
    pub async fn add_script(&self, script: Script) {
        self.scripts.lock().await.push_back(script);
    }

    /// Flip connectivity as if the socket opened or dropped.
    pub fn set_connected(&self, connected: bool) {
        self.state.send_modify(|s| {
            s.connected = connected;
            if connected {
                s.phase = ChannelPhase::Open;
                s.reconnect_attempt = 0;
            } else {
                s.phase = ChannelPhase::Closed;
                s.typing = false;
                s.reconnect_attempt += 1;
            }
        });
    }

    pub fn set_typing(&self, typing: bool) {
        self.state.send_modify(|s| s.typing = typing);
    }

    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Conversation ids passed to `open()`.
    pub async fn opened(&self) -> Vec<String> {
        self.opened.lock().await.clone()
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatChannel for MockChannel {
    async fn open(&self, conversation_id: &str) -> Result<(), ChatError> {
        if self.state.borrow().is_terminal() {
            return Err(ChatError::InvalidState("mock channel destroyed".into()));
        }
        self.opened.lock().await.push(conversation_id.to_string());
        if self.connect_on_open {
            self.set_connected(true);
        }
        Ok(())
    }

    fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    async fn open_turn(&self, text: &str, context: Option<Value>) -> Result<ChunkStream, ChatError> {
        if !self.is_connected() {
            return Err(ChatError::NotConnected);
        }
        self.sent.lock().await.push(SentMessage {
            text: text.to_string(),
            context,
        });
        let script = self
            .scripts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Script::reply(&["mock response"]));
        Ok(script.into_stream())
    }

    async fn close(&self) {
        self.state.send_modify(|s| {
            s.connected = false;
            s.typing = false;
            s.phase = ChannelPhase::Destroyed;
        });
    }
}
