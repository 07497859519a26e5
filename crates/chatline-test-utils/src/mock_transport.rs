// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock fallback transport for deterministic testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chatline_core::{ChatError, ChunkStream, Message, RequestTransport, Role};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::script::Script;

/// One request the pipeline issued.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportCall {
    pub conversation_id: String,
    pub text: String,
    pub streaming: bool,
}

/// A mock request/response transport.
///
/// Streamed turns play scripts from a FIFO queue, plain turns pop replies
/// from another. A configured failure status makes every request fail the
/// way a non-success response would.
pub struct MockTransport {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    replies: Arc<Mutex<VecDeque<Message>>>,
    failure: Arc<Mutex<Option<u16>>>,
    calls: Arc<Mutex<Vec<TransportCall>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::new())),
            replies: Arc::new(Mutex::new(VecDeque::new())),
            failure: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn add_script(&self, script: Script) {
        self.scripts.lock().await.push_back(script);
    }

    pub async fn add_reply(&self, message: Message) {
        self.replies.lock().await.push_back(message);
    }

    /// Fail every subsequent request with `status`.
    pub async fn fail_with_status(&self, status: u16) {
        *self.failure.lock().await = Some(status);
    }

    pub async fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    async fn record(&self, conversation_id: &str, text: &str, streaming: bool) -> Result<(), ChatError> {
        self.calls.lock().await.push(TransportCall {
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
            streaming,
        });
        match *self.failure.lock().await {
            Some(status) => Err(ChatError::transport(format!(
                "server returned {status}: mock failure"
            ))),
            None => Ok(()),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestTransport for MockTransport {
    async fn stream_turn(
        &self,
        conversation_id: &str,
        text: &str,
        _context: Option<Value>,
    ) -> Result<ChunkStream, ChatError> {
        self.record(conversation_id, text, true).await?;
        let script = self
            .scripts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Script::reply(&["mock response"]));
        Ok(script.into_stream())
    }

    async fn complete_turn(
        &self,
        conversation_id: &str,
        text: &str,
        _context: Option<Value>,
    ) -> Result<Message, ChatError> {
        self.record(conversation_id, text, false).await?;
        Ok(self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Message::new(Role::Agent, "mock response")))
    }
}
