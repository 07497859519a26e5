// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-turn view over the channel's event queue.

use std::collections::VecDeque;
use std::sync::Arc;

use chatline_core::{ChatError, ChunkKind, ChunkStream, Message, StreamChunk};
use futures::stream;
use tokio::sync::{Mutex, OwnedMutexGuard, mpsc};

/// Something the connection task observed that a turn may care about.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// One delta of the agent's answer.
    Chunk(StreamChunk),
    /// The agent's answer delivered whole.
    Message(Message),
    /// Backend-reported error frame.
    Error(String),
    /// The socket closed.
    Closed,
}

pub(crate) type EventReceiver = Arc<Mutex<mpsc::Receiver<ChannelEvent>>>;

/// Drops every event queued before this turn started.
pub(crate) fn drain_stale(rx: &mut mpsc::Receiver<ChannelEvent>) -> usize {
    let mut dropped = 0;
    while rx.try_recv().is_ok() {
        dropped += 1;
    }
    dropped
}

struct TurnEvents {
    rx: OwnedMutexGuard<mpsc::Receiver<ChannelEvent>>,
    pending: VecDeque<Result<StreamChunk, ChatError>>,
    streamed: String,
    finished: bool,
}

/// Turns the exclusive event receiver into the chunk stream of one turn.
///
/// The guard is held until the stream is dropped, so two turns never read
/// from the queue at the same time.
pub(crate) fn turn_stream(rx: OwnedMutexGuard<mpsc::Receiver<ChannelEvent>>) -> ChunkStream {
    let state = TurnEvents {
        rx,
        pending: VecDeque::new(),
        streamed: String::new(),
        finished: false,
    };
    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            let Some(event) = state.rx.recv().await else {
                state.finished = true;
                state.pending.push_back(Err(ChatError::transport("channel task ended mid-turn")));
                continue;
            };
            state.translate(event);
        }
    }))
}

impl TurnEvents {
    fn translate(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Chunk(chunk) => {
                if chunk.kind == ChunkKind::Content
                    && let Some(delta) = chunk.delta()
                {
                    self.streamed.push_str(delta);
                }
                self.finished = chunk.is_terminal();
                self.pending.push_back(Ok(chunk));
            }
            ChannelEvent::Message(message) => {
                self.finished = true;
                self.pending.extend(whole_message_chunks(&self.streamed, message).map(Ok));
            }
            ChannelEvent::Error(reason) => {
                self.finished = true;
                self.pending.push_back(Err(ChatError::transport(reason)));
            }
            ChannelEvent::Closed => {
                self.finished = true;
                self.pending
                    .push_back(Err(ChatError::transport("channel closed mid-turn")));
            }
        }
    }
}

/// Expresses a complete agent message as the chunks still missing from
/// what was already streamed. Content that diverges from the streamed
/// prefix is not re-sent, keeping the visible text append-only.
fn whole_message_chunks(
    streamed: &str,
    message: Message,
) -> impl Iterator<Item = StreamChunk> {
    let mut chunks = Vec::with_capacity(3);
    if let Some(rest) = message.content.strip_prefix(streamed)
        && !rest.is_empty()
    {
        chunks.push(StreamChunk::content(rest));
    }
    if let Some(intent) = message.intent {
        chunks.push(StreamChunk::new(ChunkKind::Intent).with_metadata(intent));
    }
    let mut done = StreamChunk::done();
    done.metadata = message.metadata;
    chunks.push(done);
    chunks.into_iter()
}
