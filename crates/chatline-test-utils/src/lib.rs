// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Chatline integration tests.
//!
//! Provides mock transports and a pipeline harness for fast, deterministic
//! tests without a live agent backend.
//!
//! # Components
//!
//! - [`MockChannel`] - Scripted persistent channel with a connectivity switch
//! - [`MockTransport`] - Scripted fallback transport with failure injection
//! - [`RecordingHooks`] - Captures checkout and conversation-start signals
//! - [`TestHarness`] - A bound pipeline over all of the above

pub mod harness;
pub mod hooks;
pub mod mock_channel;
pub mod mock_transport;
pub mod script;

pub use harness::{TEST_CONVERSATION, TestHarness, TestHarnessBuilder};
pub use hooks::RecordingHooks;
pub use mock_channel::{MockChannel, SentMessage};
pub use mock_transport::{MockTransport, TransportCall};
pub use script::{Script, Step};
