// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Chatline message pipeline.
//!
//! This crate provides the data model (messages, stream chunks, channel
//! state), the error taxonomy, and the traits that let the pipeline drive
//! either transport without knowing which one it holds.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ChatError;
pub use traits::{ChatChannel, ChunkStream, NoopHooks, PipelineHooks, RequestTransport};
pub use types::{
    ChannelPhase, ChannelState, ChunkKind, Conversation, Message, Role, StreamChunk,
    new_turn_id,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_through_display_and_serde() {
        for role in [Role::User, Role::Agent, Role::System] {
            let parsed = Role::from_str(&role.to_string()).expect("should parse back");
            assert_eq!(role, parsed);
        }
        assert_eq!(serde_json::to_string(&Role::Agent).unwrap(), "\"agent\"");
    }

    #[test]
    fn chunk_delta_accepts_either_key() {
        let a: StreamChunk = serde_json::from_str(r#"{"type":"content","content":"hi"}"#).unwrap();
        let b: StreamChunk = serde_json::from_str(r#"{"type":"content","chunk":"hi"}"#).unwrap();
        assert_eq!(a.delta(), Some("hi"));
        assert_eq!(b.delta(), Some("hi"));
        assert_eq!(a.kind, ChunkKind::Content);
    }

    #[test]
    fn chunk_delta_prefers_content_key() {
        let c: StreamChunk =
            serde_json::from_str(r#"{"type":"content","content":"a","chunk":"b"}"#).unwrap();
        assert_eq!(c.delta(), Some("a"));
    }

    #[test]
    fn unknown_chunk_type_is_rejected() {
        let result = serde_json::from_str::<StreamChunk>(r#"{"type":"sparkle"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn terminal_kinds() {
        assert!(StreamChunk::done().is_terminal());
        assert!(StreamChunk::new(ChunkKind::Error).is_terminal());
        assert!(!StreamChunk::content("x").is_terminal());
    }

    #[test]
    fn checkout_url_is_read_from_metadata() {
        let mut msg = Message::new(Role::Agent, "done");
        assert_eq!(msg.checkout_url(), None);
        msg.metadata = Some(serde_json::json!({"checkout_url": "https://x/checkout/1"}));
        assert_eq!(msg.checkout_url(), Some("https://x/checkout/1"));
    }

    #[test]
    fn message_deserializes_with_defaults() {
        let msg: Message = serde_json::from_str(r#"{"id":"m1","role":"agent"}"#).unwrap();
        assert_eq!(msg.id, "m1");
        assert_eq!(msg.content, "");
        assert!(msg.metadata.is_none());
    }

    #[test]
    fn fresh_turn_ids_are_unique() {
        assert_ne!(new_turn_id(), new_turn_id());
        assert_ne!(Message::user("a").id, Message::user("a").id);
    }

    #[test]
    fn channel_state_defaults_to_closed() {
        let state = ChannelState::default();
        assert_eq!(state.phase, ChannelPhase::Closed);
        assert!(!state.connected);
        assert!(!state.typing);
        assert_eq!(state.reconnect_attempt, 0);
        assert!(!state.is_terminal());
    }

    #[test]
    fn error_display() {
        assert_eq!(ChatError::NotConnected.to_string(), "channel is not connected");
        assert_eq!(
            ChatError::transport("API returned 500").to_string(),
            "transport error: API returned 500"
        );
    }

    #[test]
    fn all_traits_are_object_safe() {
        fn _channel(_: &dyn ChatChannel) {}
        fn _transport(_: &dyn RequestTransport) {}
        fn _hooks(_: &dyn PipelineHooks) {}
    }
}
