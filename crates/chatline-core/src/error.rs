// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Chatline message pipeline.

use thiserror::Error;

/// The primary error type used across Chatline transports and the pipeline.
#[derive(Debug, Error)]
pub enum ChatError {
    /// A send was attempted on a channel that is not open.
    ///
    /// Callers must check `connected` before choosing the channel path
    /// instead of relying on this error for control flow.
    #[error("channel is not connected")]
    NotConnected,

    /// Non-success response status or a channel-level failure.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A wire frame could not be decoded. Only ever logged, never propagated
    /// past the chunk parser.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Stream assembler misuse (starting a turn before finalizing the last).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// No chunk arrived within the idle bound.
    #[error("no chunk received within {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The turn was cancelled by conversation teardown.
    #[error("turn cancelled")]
    Cancelled,

    /// Configuration errors (invalid endpoint, bad backoff parameters).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Shorthand for a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        ChatError::Transport {
            message: message.into(),
            source: None,
        }
    }
}
