// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted agent turns shared by the mock transports.

use chatline_core::{ChatError, ChunkStream, StreamChunk};
use futures::stream::{self, StreamExt};

/// One step of a scripted chunk stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Chunk(StreamChunk),
    /// The stream yields a transport error.
    Fail(String),
    /// The stream never yields again.
    Hang,
}

/// A scripted answer to one turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content deltas followed by the terminal marker.
    pub fn reply(pieces: &[&str]) -> Self {
        pieces
            .iter()
            .fold(Self::new(), |script, piece| script.content(piece))
            .done()
    }

    pub fn chunk(mut self, chunk: StreamChunk) -> Self {
        self.steps.push(Step::Chunk(chunk));
        self
    }

    pub fn content(self, text: &str) -> Self {
        self.chunk(StreamChunk::content(text))
    }

    pub fn done(self) -> Self {
        self.chunk(StreamChunk::done())
    }

    pub fn fail(mut self, reason: &str) -> Self {
        self.steps.push(Step::Fail(reason.to_string()));
        self
    }

    pub fn hang(mut self) -> Self {
        self.steps.push(Step::Hang);
        self
    }

    /// Plays the script back as a chunk stream.
    pub fn into_stream(self) -> ChunkStream {
        let mut items = Vec::new();
        let mut hangs = false;
        for step in self.steps {
            match step {
                Step::Chunk(chunk) => items.push(Ok(chunk)),
                Step::Fail(reason) => items.push(Err(ChatError::transport(reason))),
                Step::Hang => {
                    hangs = true;
                    break;
                }
            }
        }
        let played = stream::iter(items);
        if hangs {
            Box::pin(played.chain(stream::pending()))
        } else {
            Box::pin(played)
        }
    }
}
