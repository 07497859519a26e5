// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation bootstrap: `POST /conversations`.

use chatline_core::{ChatError, Conversation};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
struct CreateConversationRequest<'a> {
    session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    organization_id: Option<&'a str>,
}

/// Creates conversations on the agent backend.
#[derive(Debug, Clone)]
pub struct ConversationClient {
    client: reqwest::Client,
    base_url: String,
}

impl ConversationClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Starts a conversation for a visitor session.
    pub async fn create(
        &self,
        session_id: &str,
        organization_id: Option<&str>,
    ) -> Result<Conversation, ChatError> {
        let url = format!("{}/conversations", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&CreateConversationRequest {
                session_id,
                organization_id,
            })
            .send()
            .await
            .map_err(|e| ChatError::Transport {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::transport(format!(
                "conversation create returned {status}: {body}"
            )));
        }

        let conversation: Conversation = response.json().await.map_err(|e| ChatError::Transport {
            message: format!("failed to decode conversation: {e}"),
            source: Some(Box::new(e)),
        })?;
        info!(conversation_id = %conversation.id, "conversation created");
        Ok(conversation)
    }
}
