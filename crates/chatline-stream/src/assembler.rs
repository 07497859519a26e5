// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folds the chunks of one in-flight agent turn into a single growing message.
//!
//! Content is append-only: every snapshot's content is a prefix of the next.
//! Non-content chunks only touch `metadata` and `intent`.

use chatline_core::{ChatError, ChunkKind, Message, Role, StreamChunk};
use serde_json::{Map, Value};

/// Result of folding one chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum Fold {
    /// The assembling message changed; carries the new snapshot.
    Updated(Message),
    /// A terminal marker was folded; the turn is complete.
    Terminated,
    /// The producer reported an error for this turn.
    Failed(String),
    /// The turn already terminated; the chunk has no effect.
    Ignored,
}

/// Assembles one agent turn at a time.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    current: Option<Message>,
    terminated: bool,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new assembling message with empty content.
    ///
    /// Fails with [`ChatError::InvalidState`] if the previous turn was neither
    /// finalized nor abandoned.
    pub fn begin(&mut self, turn_id: impl Into<String>) -> Result<(), ChatError> {
        if let Some(current) = &self.current {
            return Err(ChatError::InvalidState(format!(
                "turn {} is still assembling",
                current.id
            )));
        }
        self.current = Some(Message::with_id(turn_id, Role::Agent, ""));
        self.terminated = false;
        Ok(())
    }

    /// Id of the assembling turn, if any.
    pub fn turn_id(&self) -> Option<&str> {
        self.current.as_ref().map(|m| m.id.as_str())
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Applies one chunk to the assembling message.
    pub fn fold(&mut self, chunk: &StreamChunk) -> Result<Fold, ChatError> {
        if self.terminated {
            return Ok(Fold::Ignored);
        }
        let message = self
            .current
            .as_mut()
            .ok_or_else(|| ChatError::InvalidState("fold called before begin".into()))?;

        match chunk.kind {
            ChunkKind::Error => {
                self.terminated = true;
                let reason = chunk.delta().unwrap_or("agent reported an error").to_string();
                return Ok(Fold::Failed(reason));
            }
            ChunkKind::Done => {
                merge_metadata(message, chunk.metadata.as_ref());
                self.terminated = true;
                return Ok(Fold::Terminated);
            }
            ChunkKind::Content => {
                if let Some(delta) = chunk.delta() {
                    message.content.push_str(delta);
                }
                clear_thinking(message);
                merge_metadata(message, chunk.metadata.as_ref());
            }
            ChunkKind::Thinking => {
                metadata_object(message).insert("thinking".into(), Value::Bool(true));
                merge_metadata(message, chunk.metadata.as_ref());
            }
            ChunkKind::Intent => {
                message.intent = chunk
                    .metadata
                    .clone()
                    .or_else(|| chunk.delta().map(|d| Value::String(d.to_string())));
            }
            ChunkKind::Action | ChunkKind::Tool => {
                let key = if chunk.kind == ChunkKind::Action {
                    "actions"
                } else {
                    "tools"
                };
                if let Some(payload) = chunk
                    .metadata
                    .clone()
                    .or_else(|| chunk.delta().map(|d| Value::String(d.to_string())))
                {
                    push_entry(message, key, payload);
                }
                merge_metadata(message, chunk.metadata.as_ref());
            }
        }

        Ok(Fold::Updated(message.clone()))
    }

    /// Returns the assembled message and clears state.
    ///
    /// A turn with no content still yields an (empty) message.
    pub fn finalize(&mut self) -> Result<Message, ChatError> {
        let mut message = self
            .current
            .take()
            .ok_or_else(|| ChatError::InvalidState("finalize called before begin".into()))?;
        self.terminated = false;
        clear_thinking(&mut message);
        Ok(message)
    }

    /// Discards the partial message, if any.
    pub fn abandon(&mut self) -> Option<Message> {
        self.terminated = false;
        self.current.take()
    }
}

fn metadata_object(message: &mut Message) -> &mut Map<String, Value> {
    if !matches!(message.metadata, Some(Value::Object(_))) {
        message.metadata = Some(Value::Object(Map::new()));
    }
    match message.metadata.as_mut() {
        Some(Value::Object(map)) => map,
        _ => unreachable!("metadata was just set to an object"),
    }
}

/// Shallow key-by-key merge of an object payload. Non-object payloads are
/// left to the kind-specific handling.
fn merge_metadata(message: &mut Message, patch: Option<&Value>) {
    if let Some(Value::Object(patch)) = patch {
        let target = metadata_object(message);
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

fn push_entry(message: &mut Message, key: &str, entry: Value) {
    let slot = metadata_object(message)
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    match slot {
        Value::Array(items) => items.push(entry),
        other => *other = Value::Array(vec![other.take(), entry]),
    }
}

fn clear_thinking(message: &mut Message) {
    if let Some(Value::Object(map)) = message.metadata.as_mut() {
        map.remove("thinking");
        if map.is_empty() {
            message.metadata = None;
        }
    }
}
