// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-supplied callbacks invoked by the pipeline.

/// Side signals the pipeline forwards to its owner without interpreting them.
pub trait PipelineHooks: Send + Sync {
    /// An agent message carried `metadata.checkout_url`. Called once per turn.
    fn on_checkout(&self, _url: &str) {}

    /// Conversation bootstrap completed.
    fn on_conversation_started(&self, _conversation_id: &str) {}
}

/// Hooks that ignore every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl PipelineHooks for NoopHooks {}
