// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for turn orchestration over mock transports.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chatline_config::model::ConcurrentSends;
use chatline_core::{ChannelPhase, ChatError, ChunkKind, Message, Role, StreamChunk};
use chatline_fallback::{ConversationClient, HttpFallback};
use chatline_pipeline::{MessagePipeline, PipelineOptions, SendOutcome};
use chatline_test_utils::{MockChannel, RecordingHooks, Script, TEST_CONVERSATION, TestHarness};
use serde_json::json;

const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

fn user(text: &str) -> (Role, String) {
    (Role::User, text.to_string())
}

fn agent(text: &str) -> (Role, String) {
    (Role::Agent, text.to_string())
}

#[tokio::test]
async fn blank_text_is_ignored() {
    let harness = TestHarness::builder().build().await;
    assert!(matches!(harness.send("   ").await, SendOutcome::Ignored));
    assert!(matches!(harness.send("").await, SendOutcome::Ignored));
    assert!(harness.pipeline.log().is_empty());
    assert_eq!(harness.channel.sent_count().await, 0);
}

#[tokio::test]
async fn unbound_pipeline_ignores_messages() {
    let harness = TestHarness::builder().unbound().build().await;
    assert!(matches!(harness.send("hi").await, SendOutcome::Ignored));
    assert!(harness.pipeline.log().is_empty());
}

#[tokio::test]
async fn connected_channel_carries_the_turn() {
    let harness = TestHarness::builder()
        .channel_script(Script::reply(&["It costs ", "$10."]))
        .build()
        .await;
    assert!(harness.pipeline.connected());

    let outcome = harness.send("price?").await;
    assert!(matches!(outcome, SendOutcome::Completed(ref m) if m.content == "It costs $10."));
    assert_eq!(
        harness.transcript(),
        vec![user("price?"), agent("It costs $10.")]
    );
    assert_eq!(harness.channel.sent_messages().await[0].text, "price?");
    assert_eq!(harness.transport.call_count().await, 0);
}

#[tokio::test]
async fn disconnected_channel_uses_streamed_fallback() {
    let harness = TestHarness::builder()
        .connected(false)
        .transport_script(Script::reply(&["Hello"]))
        .build()
        .await;

    harness.send("hi").await;
    assert_eq!(harness.transcript(), vec![user("hi"), agent("Hello")]);
    let calls = harness.transport.calls().await;
    assert_eq!(calls.len(), 1);
    assert!(calls[0].streaming);
    assert_eq!(calls[0].conversation_id, TEST_CONVERSATION);
    assert_eq!(harness.channel.sent_count().await, 0);
}

#[tokio::test]
async fn streaming_disabled_uses_plain_fallback_even_when_connected() {
    let harness = TestHarness::builder()
        .streaming(false)
        .transport_reply(Message::with_id("m-1", Role::Agent, "Plain answer"))
        .build()
        .await;

    harness.send("hi").await;
    assert_eq!(harness.transcript(), vec![user("hi"), agent("Plain answer")]);
    assert!(!harness.transport.calls().await[0].streaming);
    assert_eq!(harness.channel.sent_count().await, 0);
    assert!(harness.channel.opened().await.is_empty());
}

#[tokio::test]
async fn fallback_failure_leaves_user_message_and_one_apology() {
    let harness = TestHarness::builder()
        .connected(false)
        .transport_failure(500)
        .build()
        .await;

    let outcome = harness.send("hi").await;
    assert!(matches!(outcome, SendOutcome::Failed(ChatError::Transport { .. })));
    assert_eq!(harness.transcript(), vec![user("hi"), agent(APOLOGY)]);
}

#[tokio::test]
async fn failure_mid_turn_replaces_partial_message() {
    let harness = TestHarness::builder()
        .channel_script(Script::new().content("Hel").fail("channel closed mid-turn"))
        .build()
        .await;

    harness.send("hi").await;
    let log = harness.pipeline.log();
    assert_eq!(log.len(), 2);
    assert_eq!(log.last().unwrap().content, APOLOGY);
    assert_eq!(log.last().unwrap().role, Role::Agent);
}

#[tokio::test]
async fn agent_error_chunk_fails_the_turn() {
    let error = StreamChunk {
        content: Some("agent unavailable".into()),
        ..StreamChunk::new(ChunkKind::Error)
    };
    let harness = TestHarness::builder()
        .channel_script(Script::new().chunk(error))
        .build()
        .await;

    assert!(matches!(harness.send("hi").await, SendOutcome::Failed(_)));
    assert_eq!(harness.transcript(), vec![user("hi"), agent(APOLOGY)]);
}

#[tokio::test]
async fn checkout_hook_fires_once_with_exact_url() {
    let url = "https://shop.example/checkout/abc";
    let harness = TestHarness::builder()
        .channel_script(
            Script::new()
                .content("Your cart is ready.")
                .chunk(StreamChunk::new(ChunkKind::Action).with_metadata(json!({"checkout_url": url})))
                .chunk(StreamChunk::done().with_metadata(json!({"checkout_url": url}))),
        )
        .build()
        .await;

    harness.send("buy it").await;
    assert_eq!(harness.hooks.checkouts(), vec![url.to_string()]);
    assert_eq!(harness.pipeline.log().last().unwrap().checkout_url(), Some(url));
}

#[tokio::test]
async fn no_checkout_url_means_no_hook() {
    let harness = TestHarness::builder().build().await;
    harness.send("hi").await;
    assert!(harness.hooks.checkouts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stalled_stream_times_out_into_apology() {
    let harness = TestHarness::builder()
        .chunk_timeout(Some(Duration::from_secs(60)))
        .channel_script(Script::new().content("Thinking").hang())
        .build()
        .await;

    let outcome = harness.send("hi").await;
    assert!(matches!(outcome, SendOutcome::Failed(ChatError::Timeout { .. })));
    assert_eq!(harness.transcript(), vec![user("hi"), agent(APOLOGY)]);
}

#[tokio::test]
async fn shutdown_cancels_in_flight_turn() {
    let harness = TestHarness::builder()
        .chunk_timeout(None)
        .channel_script(Script::new().content("Hel").hang())
        .build()
        .await;

    let pipeline = harness.pipeline.clone();
    let turn = tokio::spawn(async move { pipeline.send_message("hi").await });
    let mut log = harness.pipeline.subscribe();
    log.wait_for(|l| l.len() == 2).await.unwrap();

    harness.pipeline.shutdown().await;
    assert!(matches!(turn.await.unwrap(), SendOutcome::Cancelled));
    assert_eq!(harness.transcript(), vec![user("hi")]);
    assert_eq!(harness.pipeline.channel_state().phase, ChannelPhase::Destroyed);
    assert!(harness.pipeline.set_conversation("other").await.is_err());
}

#[tokio::test]
async fn reject_policy_returns_busy_but_keeps_user_text() {
    let harness = TestHarness::builder()
        .concurrent_sends(ConcurrentSends::Reject)
        .chunk_timeout(None)
        .channel_script(Script::new().hang())
        .build()
        .await;

    let pipeline = harness.pipeline.clone();
    let first = tokio::spawn(async move { pipeline.send_message("one").await });
    let mut log = harness.pipeline.subscribe();
    log.wait_for(|l| l.len() == 1).await.unwrap();

    assert!(matches!(harness.send("two").await, SendOutcome::Busy));
    assert_eq!(harness.transcript(), vec![user("one"), user("two")]);

    harness.pipeline.shutdown().await;
    assert!(matches!(first.await.unwrap(), SendOutcome::Cancelled));
}

#[tokio::test]
async fn queue_policy_runs_turns_in_order() {
    let harness = TestHarness::builder()
        .channel_script(Script::reply(&["first"]))
        .channel_script(Script::reply(&["second"]))
        .build()
        .await;

    let (a, b) = tokio::join!(harness.send("one"), harness.send("two"));
    assert!(matches!(a, SendOutcome::Completed(ref m) if m.content == "first"));
    assert!(matches!(b, SendOutcome::Completed(ref m) if m.content == "second"));
    assert_eq!(harness.pipeline.log().len(), 4);
}

#[tokio::test]
async fn each_turn_stays_one_visible_message() {
    let harness = TestHarness::builder()
        .channel_script(Script::reply(&["a", "b", "c"]))
        .channel_script(Script::reply(&["d"]))
        .build()
        .await;

    harness.send("one").await;
    harness.send("two").await;
    assert_eq!(
        harness.transcript(),
        vec![user("one"), agent("abc"), user("two"), agent("d")]
    );
}

#[tokio::test]
async fn channel_and_fallback_produce_the_same_log() {
    let script = Script::new()
        .chunk(StreamChunk::new(ChunkKind::Thinking))
        .content("Our plan ")
        .content("costs $10.")
        .done();
    let over_channel = TestHarness::builder()
        .channel_script(script.clone())
        .build()
        .await;
    let over_fallback = TestHarness::builder()
        .connected(false)
        .transport_script(script)
        .build()
        .await;

    over_channel.send("price?").await;
    over_fallback.send("price?").await;
    assert_eq!(over_channel.transcript(), over_fallback.transcript());
    let a = over_channel.pipeline.log().last().unwrap().clone();
    let b = over_fallback.pipeline.log().last().unwrap().clone();
    assert_eq!(a.metadata, b.metadata);
}

#[tokio::test]
async fn channel_state_passes_through() {
    let harness = TestHarness::builder().build().await;
    assert!(!harness.pipeline.typing());
    harness.channel.set_typing(true);
    assert!(harness.pipeline.typing());

    harness.channel.set_connected(false);
    let state = harness.pipeline.channel_state();
    assert!(!state.connected);
    assert_eq!(state.reconnect_attempt, 1);
    assert!(!harness.pipeline.connected());
}

#[tokio::test]
async fn rebinding_to_another_conversation_is_rejected() {
    let harness = TestHarness::builder().build().await;
    harness.pipeline.set_conversation(TEST_CONVERSATION).await.unwrap();
    assert!(matches!(
        harness.pipeline.set_conversation("other").await,
        Err(ChatError::InvalidState(_))
    ));
}

#[tokio::test]
async fn start_conversation_binds_opens_and_signals() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "c-42"})))
        .mount(&server)
        .await;

    let harness = TestHarness::builder().unbound().build().await;
    let client = ConversationClient::new(reqwest::Client::new(), server.uri());
    let conversation = harness
        .pipeline
        .start_conversation(&client, "s-1", Some("org-1"))
        .await
        .unwrap();

    assert_eq!(conversation.id, "c-42");
    assert_eq!(harness.pipeline.conversation_id().as_deref(), Some("c-42"));
    assert_eq!(harness.hooks.conversations(), vec!["c-42".to_string()]);
    assert_eq!(harness.channel.opened().await, vec!["c-42".to_string()]);
}


// --- Fallback request phase ---

/// A pipeline whose channel never connects, talking HTTP to a server that
/// accepts the request but answers only after `delay`.
async fn slow_fallback(
    delay: Duration,
    chunk_timeout: Option<Duration>,
) -> (Arc<MessagePipeline>, wiremock::MockServer) {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations/c-1/messages/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string("data: {\"type\":\"content\",\"content\":\"late\"}\n\ndata: [DONE]\n\n")
                .set_delay(delay),
        )
        .mount(&server)
        .await;

    let fallback = HttpFallback::new(server.uri(), Duration::from_secs(5)).unwrap();
    let pipeline = Arc::new(MessagePipeline::new(
        Arc::new(MockChannel::new()),
        Arc::new(fallback),
        Arc::new(RecordingHooks::new()),
        PipelineOptions {
            chunk_timeout,
            ..PipelineOptions::default()
        },
    ));
    pipeline.set_conversation("c-1").await.unwrap();
    (pipeline, server)
}

#[tokio::test]
async fn silent_fallback_request_hits_the_idle_timeout() {
    let (pipeline, _server) =
        slow_fallback(Duration::from_secs(10), Some(Duration::from_millis(300))).await;

    let started = Instant::now();
    let outcome = pipeline.send_message("hi").await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(outcome, SendOutcome::Failed(ChatError::Timeout { .. })));
    let log = pipeline.log();
    assert_eq!(log.len(), 2);
    assert_eq!(log.last().unwrap().content, APOLOGY);
}

#[tokio::test]
async fn shutdown_aborts_pending_fallback_request() {
    let (pipeline, _server) = slow_fallback(Duration::from_secs(10), None).await;

    let sender = pipeline.clone();
    let started = Instant::now();
    let turn = tokio::spawn(async move { sender.send_message("hi").await });
    tokio::time::sleep(Duration::from_millis(200)).await;
    pipeline.shutdown().await;

    assert!(matches!(turn.await.unwrap(), SendOutcome::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
    let log = pipeline.log();
    assert_eq!(log.len(), 1);
    assert_eq!(log.last().unwrap().role, Role::User);
}
