// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drives one chunk stream through a [`StreamAssembler`] to completion.
//!
//! Shared by the channel and fallback paths so both produce identical
//! snapshots for identical chunk sequences.

use std::time::Duration;

use chatline_core::{ChatError, Message, StreamChunk};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::assembler::{Fold, StreamAssembler};

/// Per-turn knobs for [`drive_turn`].
#[derive(Debug, Clone, Default)]
pub struct DriveOptions {
    /// Maximum gap between two chunks. `None` waits forever.
    pub chunk_timeout: Option<Duration>,
    /// Cancelling this token aborts the turn with [`ChatError::Cancelled`].
    pub cancel: CancellationToken,
}

impl DriveOptions {
    pub fn new(chunk_timeout: Option<Duration>, cancel: CancellationToken) -> Self {
        Self {
            chunk_timeout,
            cancel,
        }
    }

    /// Runs the request phase of a turn (before any chunk exists) under the
    /// same cancellation and idle bound as the chunks themselves.
    pub async fn bound<T, F>(&self, request: F) -> Result<T, ChatError>
    where
        F: Future<Output = Result<T, ChatError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ChatError::Cancelled),
            result = within(self.chunk_timeout, request) => result,
        }
    }
}

async fn within<T, F>(limit: Option<Duration>, request: F) -> Result<T, ChatError>
where
    F: Future<Output = Result<T, ChatError>>,
{
    match limit {
        Some(duration) => tokio::time::timeout(duration, request)
            .await
            .map_err(|_| ChatError::Timeout { duration })?,
        None => request.await,
    }
}

/// Folds `stream` into one message with id `turn_id`.
///
/// `on_snapshot` is called after every chunk that changed the message.
/// The stream ending without a terminal marker finalizes normally; an
/// `error` chunk, a stream error, an idle timeout, or cancellation fails the
/// turn and discards the partial message.
pub async fn drive_turn<S, F>(
    turn_id: &str,
    mut stream: S,
    options: &DriveOptions,
    mut on_snapshot: F,
) -> Result<Message, ChatError>
where
    S: Stream<Item = Result<StreamChunk, ChatError>> + Unpin,
    F: FnMut(Message),
{
    let mut assembler = StreamAssembler::new();
    assembler.begin(turn_id)?;

    let outcome = loop {
        let next = tokio::select! {
            biased;
            _ = options.cancel.cancelled() => break Err(ChatError::Cancelled),
            next = next_chunk(&mut stream, options.chunk_timeout) => next,
        };

        let chunk = match next {
            Ok(Some(chunk)) => chunk,
            Ok(None) => {
                debug!(turn_id, "chunk stream ended");
                break Ok(());
            }
            Err(e) => break Err(e),
        };

        match assembler.fold(&chunk) {
            Ok(Fold::Updated(snapshot)) => on_snapshot(snapshot),
            Ok(Fold::Terminated) => break Ok(()),
            Ok(Fold::Failed(reason)) => break Err(ChatError::transport(reason)),
            Ok(Fold::Ignored) => {}
            Err(e) => break Err(e),
        }
    };

    match outcome {
        Ok(()) => assembler.finalize(),
        Err(e) => {
            if let Some(partial) = assembler.abandon() {
                warn!(
                    turn_id,
                    error = %e,
                    partial_len = partial.content.len(),
                    "turn failed, discarding partial message"
                );
            }
            Err(e)
        }
    }
}

async fn next_chunk<S>(
    stream: &mut S,
    timeout: Option<Duration>,
) -> Result<Option<StreamChunk>, ChatError>
where
    S: Stream<Item = Result<StreamChunk, ChatError>> + Unpin,
{
    within(timeout, async { Ok::<_, ChatError>(stream.next().await) })
        .await?
        .transpose()
}
