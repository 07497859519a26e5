// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoding of wire deltas into typed chunks and frames.
//!
//! Nothing in this module fails: a corrupt delta must never abort an
//! otherwise healthy turn, so decode errors are logged and the input is
//! treated as a no-op.

use chatline_core::{ChatError, StreamChunk};
use tracing::debug;

use crate::frame::InboundFrame;

/// Payload of the record that ends a fallback stream.
pub const END_OF_STREAM: &str = "[DONE]";

/// Marker prefixing every record of the fallback stream.
pub const DATA_PREFIX: &str = "data:";

/// Outcome of decoding one fallback stream record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Chunk(StreamChunk),
    /// Empty, control, or undecodable record.
    Skip,
    /// The sentinel; the read loop must stop.
    EndOfStream,
}

/// Decodes the payload of one record (the text after the data marker).
pub fn parse_record(data: &str) -> Record {
    let data = data.trim();
    if data.is_empty() {
        return Record::Skip;
    }
    if data == END_OF_STREAM {
        return Record::EndOfStream;
    }
    match decode::<StreamChunk>(data) {
        Ok(chunk) => Record::Chunk(chunk),
        Err(e) => {
            debug!(error = %e, "skipping undecodable stream record");
            Record::Skip
        }
    }
}

/// Decodes one raw line of the fallback stream, `data:` marker included.
///
/// Lines without the marker (comments, `event:` fields, blank separators)
/// are skipped.
pub fn parse_line(line: &str) -> Record {
    match line.trim_start().strip_prefix(DATA_PREFIX) {
        Some(data) => parse_record(data),
        None => Record::Skip,
    }
}

/// Decodes one channel frame. Malformed JSON and unknown frame types yield `None`.
pub fn parse_frame(text: &str) -> Option<InboundFrame> {
    match decode::<InboundFrame>(text) {
        Ok(frame) => Some(frame),
        Err(e) => {
            debug!(error = %e, "ignoring undecodable channel frame");
            None
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, ChatError> {
    serde_json::from_str(text).map_err(|e| ChatError::Parse {
        message: e.to_string(),
    })
}
