// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request/response fallback transport for Chatline.
//!
//! Used when the persistent channel is down or streaming is disabled.
//! Also hosts the conversation bootstrap call.

pub mod bootstrap;
pub mod client;
pub mod sse;

pub use bootstrap::ConversationClient;
pub use client::HttpFallback;

