// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent channel transport for Chatline.
//!
//! [`ChannelManager`] keeps one WebSocket per conversation alive with a
//! heartbeat, reconnects after unexpected closes, and exposes each agent
//! turn as a [`ChunkStream`](chatline_core::ChunkStream).

pub mod backoff;
pub mod manager;
pub mod turn;

pub use backoff::ReconnectPolicy;
pub use manager::{ChannelManager, ChannelOptions};
pub use turn::ChannelEvent;
