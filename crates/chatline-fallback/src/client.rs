// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP fallback transport.
//!
//! Provides [`HttpFallback`], which issues one request per turn: streamed
//! (`/messages/stream`, folded through the shared assembler) or plain
//! (`/messages`, returning the finished message).

use std::time::Duration;

use async_trait::async_trait;
use chatline_config::ChatlineConfig;
use chatline_core::{ChatError, ChunkStream, Message, RequestTransport, new_turn_id};
use chatline_stream::{DriveOptions, drive_turn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::bootstrap::ConversationClient;
use crate::sse;

/// Body of both message endpoints.
#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<Value>,
}

/// Response of the non-streamed message endpoint.
#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    message: Message,
}

/// Request/response transport used when the channel is unusable.
#[derive(Debug, Clone)]
pub struct HttpFallback {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFallback {
    /// Creates a client for `base_url` (e.g. `https://host/api/v1`).
    ///
    /// Only the connect phase is bounded; long turns are bounded per chunk
    /// by the caller instead.
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ChatError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn from_config(config: &ChatlineConfig) -> Result<Self, ChatError> {
        Self::new(
            config.endpoint.base_url.clone(),
            config.transport.connect_timeout(),
        )
    }

    /// Wraps an existing client, sharing its connection pool.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A bootstrap client sharing this transport's connection pool.
    pub fn conversations(&self) -> ConversationClient {
        ConversationClient::new(self.client.clone(), self.base_url.clone())
    }

    /// Runs one whole turn and returns the agent's message.
    ///
    /// With `streaming` set, every intermediate snapshot goes to
    /// `on_snapshot` and the result carries a fresh turn id. Otherwise the
    /// backend's message is returned as-is and `on_snapshot` is never called.
    pub async fn send<F>(
        &self,
        conversation_id: &str,
        text: &str,
        streaming: bool,
        context: Option<Value>,
        options: &DriveOptions,
        on_snapshot: F,
    ) -> Result<Message, ChatError>
    where
        F: FnMut(Message),
    {
        if !streaming {
            return options
                .bound(self.complete_turn(conversation_id, text, context))
                .await;
        }
        let turn_id = new_turn_id();
        let chunks = options
            .bound(self.stream_turn(conversation_id, text, context))
            .await?;
        drive_turn(&turn_id, chunks, options, on_snapshot).await
    }

    fn messages_url(&self, conversation_id: &str) -> String {
        format!("{}/conversations/{}/messages", self.base_url, conversation_id)
    }

    async fn post(
        &self,
        url: &str,
        text: &str,
        context: Option<Value>,
    ) -> Result<reqwest::Response, ChatError> {
        let response = self
            .client
            .post(url)
            .json(&SendMessageRequest {
                content: text,
                context,
            })
            .send()
            .await
            .map_err(|e| ChatError::Transport {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, url, "fallback response received");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ChatError::transport(format!("server returned {status}: {body}")))
    }
}

#[async_trait]
impl RequestTransport for HttpFallback {
    async fn stream_turn(
        &self,
        conversation_id: &str,
        text: &str,
        context: Option<Value>,
    ) -> Result<ChunkStream, ChatError> {
        let url = format!("{}/stream", self.messages_url(conversation_id));
        info!(conversation_id, "sending message over streamed fallback");
        let response = self.post(&url, text, context).await?;
        Ok(sse::parse_chunk_stream(response))
    }

    async fn complete_turn(
        &self,
        conversation_id: &str,
        text: &str,
        context: Option<Value>,
    ) -> Result<Message, ChatError> {
        let url = self.messages_url(conversation_id);
        info!(conversation_id, "sending message over plain fallback");
        let response = self.post(&url, text, context).await?;
        let body = response.text().await.map_err(|e| ChatError::Transport {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        let parsed: SendMessageResponse =
            serde_json::from_str(&body).map_err(|e| ChatError::Transport {
                message: format!("failed to decode message response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(parsed.message)
    }
}
