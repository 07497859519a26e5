// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message pipeline for Chatline.
//!
//! Chooses between the persistent channel and the fallback transport for
//! each turn and maintains the user-visible [`MessageLog`].

pub mod log;
pub mod pipeline;

pub use log::{MessageLog, Upsert};
pub use pipeline::{MessagePipeline, PipelineOptions, SendOutcome};
