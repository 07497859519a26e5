// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hooks that record every signal for later assertion.

use std::sync::{Mutex, MutexGuard};

use chatline_core::PipelineHooks;

#[derive(Debug, Default)]
pub struct RecordingHooks {
    checkouts: Mutex<Vec<String>>,
    conversations: Mutex<Vec<String>>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checkout URLs in the order they were signalled.
    pub fn checkouts(&self) -> Vec<String> {
        lock(&self.checkouts).clone()
    }

    /// Started conversation ids in order.
    pub fn conversations(&self) -> Vec<String> {
        lock(&self.conversations).clone()
    }
}

impl PipelineHooks for RecordingHooks {
    fn on_checkout(&self, url: &str) {
        lock(&self.checkouts).push(url.to_string());
    }

    fn on_conversation_started(&self, conversation_id: &str) {
        lock(&self.conversations).push(conversation_id.to_string());
    }
}

// A panicking test must not cascade into unrelated assertions.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
