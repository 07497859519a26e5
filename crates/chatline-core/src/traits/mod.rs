// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between the pipeline and its transports.
//!
//! Transports use `#[async_trait]` so the pipeline can hold them as trait
//! objects and tests can substitute mocks.

pub mod channel;
pub mod hooks;
pub mod transport;

pub use channel::ChatChannel;
pub use hooks::{NoopHooks, PipelineHooks};
pub use transport::{ChunkStream, RequestTransport};
