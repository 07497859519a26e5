// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline testing.
//!
//! `TestHarness` assembles a [`MessagePipeline`] over a [`MockChannel`], a
//! [`MockTransport`] and [`RecordingHooks`], bound to a test conversation.

use std::sync::Arc;
use std::time::Duration;

use chatline_config::model::ConcurrentSends;
use chatline_core::{Message, Role};
use chatline_pipeline::{MessagePipeline, PipelineOptions, SendOutcome};

use crate::hooks::RecordingHooks;
use crate::mock_channel::MockChannel;
use crate::mock_transport::MockTransport;
use crate::script::Script;

/// Conversation id every harness is bound to.
pub const TEST_CONVERSATION: &str = "test-conversation";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    options: PipelineOptions,
    connected: bool,
    bind: bool,
    channel_scripts: Vec<Script>,
    transport_scripts: Vec<Script>,
    replies: Vec<Message>,
    failure_status: Option<u16>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            options: PipelineOptions::default(),
            connected: true,
            bind: true,
            channel_scripts: Vec::new(),
            transport_scripts: Vec::new(),
            replies: Vec::new(),
            failure_status: None,
        }
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.options.streaming = streaming;
        self
    }

    /// Whether the mock channel connects when the conversation is bound.
    pub fn connected(mut self, connected: bool) -> Self {
        self.connected = connected;
        self
    }

    /// Leave the pipeline without a conversation.
    pub fn unbound(mut self) -> Self {
        self.bind = false;
        self
    }

    pub fn concurrent_sends(mut self, policy: ConcurrentSends) -> Self {
        self.options.concurrent_sends = policy;
        self
    }

    pub fn chunk_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.options.chunk_timeout = timeout;
        self
    }

    pub fn channel_script(mut self, script: Script) -> Self {
        self.channel_scripts.push(script);
        self
    }

    pub fn transport_script(mut self, script: Script) -> Self {
        self.transport_scripts.push(script);
        self
    }

    pub fn transport_reply(mut self, message: Message) -> Self {
        self.replies.push(message);
        self
    }

    /// Every fallback request fails with `status`.
    pub fn transport_failure(mut self, status: u16) -> Self {
        self.failure_status = Some(status);
        self
    }

    pub async fn build(self) -> TestHarness {
        let channel = Arc::new(if self.connected {
            MockChannel::connecting()
        } else {
            MockChannel::new()
        });
        for script in self.channel_scripts {
            channel.add_script(script).await;
        }

        let transport = Arc::new(MockTransport::new());
        for script in self.transport_scripts {
            transport.add_script(script).await;
        }
        for reply in self.replies {
            transport.add_reply(reply).await;
        }
        if let Some(status) = self.failure_status {
            transport.fail_with_status(status).await;
        }

        let hooks = Arc::new(RecordingHooks::new());
        let pipeline = Arc::new(MessagePipeline::new(
            channel.clone(),
            transport.clone(),
            hooks.clone(),
            self.options,
        ));
        if self.bind {
            pipeline
                .set_conversation(TEST_CONVERSATION)
                .await
                .expect("binding the test conversation");
        }

        TestHarness {
            pipeline,
            channel,
            transport,
            hooks,
        }
    }
}

/// A complete pipeline wired to mocks.
pub struct TestHarness {
    pub pipeline: Arc<MessagePipeline>,
    pub channel: Arc<MockChannel>,
    pub transport: Arc<MockTransport>,
    pub hooks: Arc<RecordingHooks>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub async fn send(&self, text: &str) -> SendOutcome {
        self.pipeline.send_message(text).await
    }

    /// The log reduced to `(role, content)` pairs.
    pub fn transcript(&self) -> Vec<(Role, String)> {
        self.pipeline
            .log()
            .iter()
            .map(|m| (m.role, m.content.clone()))
            .collect()
    }
}
