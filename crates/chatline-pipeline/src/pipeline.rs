// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn orchestration and transport selection.
//!
//! [`MessagePipeline`] records the user's message, picks the channel or the
//! fallback for the agent's answer, keeps exactly one visible message per
//! turn in the [`MessageLog`], and turns every failure into one apology
//! message.

use std::sync::Arc;
use std::time::Duration;

use chatline_config::ChatlineConfig;
use chatline_config::model::ConcurrentSends;
use chatline_core::{
    ChannelState, ChatChannel, ChatError, Conversation, Message, PipelineHooks, RequestTransport,
    Role, new_turn_id,
};
use chatline_fallback::ConversationClient;
use chatline_stream::{DriveOptions, drive_turn};
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::log::MessageLog;

/// Pipeline behavior knobs.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Prefer streamed answers (channel, then streamed fallback).
    pub streaming: bool,
    /// Maximum gap between two chunks of one turn.
    pub chunk_timeout: Option<Duration>,
    pub concurrent_sends: ConcurrentSends,
    /// Content of the message that replaces a failed turn.
    pub error_message: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&ChatlineConfig::default())
    }
}

impl PipelineOptions {
    pub fn from_config(config: &ChatlineConfig) -> Self {
        Self {
            streaming: config.session.streaming,
            chunk_timeout: Some(config.transport.chunk_timeout()),
            concurrent_sends: config.pipeline.concurrent_sends,
            error_message: config.pipeline.error_message.clone(),
        }
    }
}

/// How a call to [`MessagePipeline::send_message`] ended.
#[derive(Debug)]
pub enum SendOutcome {
    /// Blank text or no conversation; nothing was recorded.
    Ignored,
    /// The agent answered; carries the final message.
    Completed(Message),
    /// The turn failed and was replaced by the apology message.
    Failed(ChatError),
    /// The conversation was torn down mid-turn. The partial agent message,
    /// if any was shown, is removed; the user message stays.
    Cancelled,
    /// Another turn was in flight and the policy is to reject.
    Busy,
}

/// Which transport carried a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Channel,
    StreamedFallback,
    PlainFallback,
}

/// Drives a conversation's turns over whichever transport is usable.
pub struct MessagePipeline {
    channel: Arc<dyn ChatChannel>,
    transport: Arc<dyn RequestTransport>,
    hooks: Arc<dyn PipelineHooks>,
    options: PipelineOptions,
    conversation: watch::Sender<Option<String>>,
    log: watch::Sender<MessageLog>,
    turn_slot: Mutex<()>,
    cancel: CancellationToken,
}

impl MessagePipeline {
    pub fn new(
        channel: Arc<dyn ChatChannel>,
        transport: Arc<dyn RequestTransport>,
        hooks: Arc<dyn PipelineHooks>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            channel,
            transport,
            hooks,
            options,
            conversation: watch::channel(None).0,
            log: watch::channel(MessageLog::new()).0,
            turn_slot: Mutex::new(()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.conversation.borrow().clone()
    }

    /// Binds the pipeline to an existing conversation and, when streaming,
    /// opens its channel. A channel that fails to open only means turns use
    /// the fallback.
    pub async fn set_conversation(&self, conversation_id: &str) -> Result<(), ChatError> {
        if self.cancel.is_cancelled() {
            return Err(ChatError::InvalidState("pipeline is shut down".into()));
        }
        let mut conflict = None;
        self.conversation.send_if_modified(|current| match current {
            Some(existing) => {
                if existing.as_str() != conversation_id {
                    conflict = Some(existing.clone());
                }
                false
            }
            None => {
                *current = Some(conversation_id.to_string());
                true
            }
        });
        if let Some(existing) = conflict {
            return Err(ChatError::InvalidState(format!(
                "pipeline already serves conversation {existing}"
            )));
        }
        info!(conversation_id, "conversation bound");

        if self.options.streaming
            && let Err(e) = self.channel.open(conversation_id).await
        {
            warn!(conversation_id, error = %e, "channel unavailable, using fallback");
        }
        Ok(())
    }

    /// Creates a conversation, binds to it, and reports it to the hooks.
    pub async fn start_conversation(
        &self,
        client: &ConversationClient,
        session_id: &str,
        organization_id: Option<&str>,
    ) -> Result<Conversation, ChatError> {
        let conversation = client.create(session_id, organization_id).await?;
        self.set_conversation(&conversation.id).await?;
        self.hooks.on_conversation_started(&conversation.id);
        Ok(conversation)
    }

    /// Sends a user message and waits for the agent's answer.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        self.send_message_with_context(text, None).await
    }

    /// Like [`send_message`](Self::send_message), attaching page context
    /// for the agent.
    pub async fn send_message_with_context(&self, text: &str, context: Option<Value>) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }
        let Some(conversation_id) = self.conversation_id() else {
            debug!("no conversation bound, ignoring message");
            return SendOutcome::Ignored;
        };

        // Recorded before any await so the user's text is never lost.
        self.upsert(Message::user(text));

        let Some(_slot) = self.acquire_slot().await else {
            info!(conversation_id = %conversation_id, "turn in flight, rejecting message");
            return SendOutcome::Busy;
        };
        if self.cancel.is_cancelled() {
            return SendOutcome::Cancelled;
        }

        let turn_id = new_turn_id();
        let options = DriveOptions::new(self.options.chunk_timeout, self.cancel.child_token());
        match self
            .run_turn(&conversation_id, &turn_id, text, context, &options)
            .await
        {
            Ok(message) => {
                self.upsert(message.clone());
                if let Some(url) = message.checkout_url() {
                    info!(conversation_id = %conversation_id, turn_id = %message.id, "checkout signalled");
                    self.hooks.on_checkout(url);
                }
                SendOutcome::Completed(message)
            }
            Err(ChatError::Cancelled) => {
                info!(conversation_id = %conversation_id, turn_id = %turn_id, "turn cancelled");
                self.log.send_if_modified(|log| log.remove(&turn_id).is_some());
                SendOutcome::Cancelled
            }
            Err(e) => {
                error!(conversation_id = %conversation_id, turn_id = %turn_id, error = %e, "turn failed");
                self.upsert(Message::with_id(
                    turn_id,
                    Role::Agent,
                    self.options.error_message.clone(),
                ));
                SendOutcome::Failed(e)
            }
        }
    }

    /// Cancels the in-flight turn and tears the channel down.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.channel.close().await;
        info!("pipeline shut down");
    }

    /// Snapshot of the conversation.
    pub fn log(&self) -> MessageLog {
        self.log.borrow().clone()
    }

    /// Receiver notified on every log change.
    pub fn subscribe(&self) -> watch::Receiver<MessageLog> {
        self.log.subscribe()
    }

    pub fn connected(&self) -> bool {
        self.channel.is_connected()
    }

    pub fn typing(&self) -> bool {
        self.channel.state().typing
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    pub fn subscribe_channel(&self) -> watch::Receiver<ChannelState> {
        self.channel.subscribe()
    }

    async fn acquire_slot(&self) -> Option<MutexGuard<'_, ()>> {
        match self.options.concurrent_sends {
            ConcurrentSends::Queue => Some(self.turn_slot.lock().await),
            ConcurrentSends::Reject => self.turn_slot.try_lock().ok(),
        }
    }

    fn route(&self) -> Route {
        match (self.options.streaming, self.channel.is_connected()) {
            (true, true) => Route::Channel,
            (true, false) => Route::StreamedFallback,
            (false, _) => Route::PlainFallback,
        }
    }

    async fn run_turn(
        &self,
        conversation_id: &str,
        turn_id: &str,
        text: &str,
        context: Option<Value>,
        options: &DriveOptions,
    ) -> Result<Message, ChatError> {
        let upsert = |snapshot: Message| self.upsert(snapshot);
        match self.route() {
            Route::Channel => match options
                .bound(self.channel.open_turn(text, context.clone()))
                .await
            {
                Ok(chunks) => {
                    debug!(conversation_id, turn_id, "turn over channel");
                    drive_turn(turn_id, chunks, options, upsert).await
                }
                Err(ChatError::NotConnected) => {
                    debug!(conversation_id, turn_id, "channel dropped before send, using fallback");
                    let chunks = options
                        .bound(self.transport.stream_turn(conversation_id, text, context))
                        .await?;
                    drive_turn(turn_id, chunks, options, upsert).await
                }
                Err(e) => Err(e),
            },
            Route::StreamedFallback => {
                debug!(conversation_id, turn_id, "turn over streamed fallback");
                let chunks = options
                    .bound(self.transport.stream_turn(conversation_id, text, context))
                    .await?;
                drive_turn(turn_id, chunks, options, upsert).await
            }
            Route::PlainFallback => {
                debug!(conversation_id, turn_id, "turn over plain fallback");
                options
                    .bound(self.transport.complete_turn(conversation_id, text, context))
                    .await
            }
        }
    }

    fn upsert(&self, message: Message) {
        self.log.send_modify(|log| {
            log.upsert(message);
        });
    }
}
