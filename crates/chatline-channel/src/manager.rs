// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket channel manager.
//!
//! One spawned task owns the socket. It multiplexes the read half, the
//! heartbeat tick, the outbound queue and cancellation with `select!`, and
//! reconnects with capped exponential backoff after an unexpected close.
//! State changes are published through a `watch` channel; agent traffic is
//! forwarded as [`ChannelEvent`]s to whichever turn holds the event queue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chatline_config::ChatlineConfig;
use chatline_core::{ChannelPhase, ChannelState, ChatChannel, ChatError, ChunkStream};
use chatline_stream::{AgentPayload, InboundFrame, OutboundFrame, parse_frame};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::ReconnectPolicy;
use crate::turn::{ChannelEvent, EventReceiver, drain_stale, turn_stream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Capacity of the agent event queue between the socket task and turns.
const EVENT_BUFFER: usize = 1024;

/// Capacity of the per-connection outbound frame queue.
const OUTBOUND_BUFFER: usize = 32;

/// Connection parameters for a [`ChannelManager`].
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// Base channel endpoint, e.g. `wss://host/api/v1`.
    pub ws_url: String,
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl ChannelOptions {
    pub fn from_config(config: &ChatlineConfig) -> Self {
        Self {
            ws_url: config.endpoint.resolved_ws_url(),
            heartbeat_interval: config.channel.heartbeat_interval(),
            connect_timeout: config.transport.connect_timeout(),
            reconnect: ReconnectPolicy::from_config(&config.channel),
        }
    }

    /// URL of the channel for one conversation.
    pub fn conversation_url(&self, conversation_id: &str) -> String {
        format!(
            "{}/conversations/{}/ws",
            self.ws_url.trim_end_matches('/'),
            conversation_id
        )
    }
}

struct Shared {
    options: ChannelOptions,
    state: watch::Sender<ChannelState>,
    outbound: Mutex<Option<mpsc::Sender<OutboundFrame>>>,
    events_tx: mpsc::Sender<ChannelEvent>,
    events_rx: EventReceiver,
    cancel: CancellationToken,
}

/// Why the read loop of one connection stopped.
enum PumpExit {
    Closed,
    Cancelled,
}

/// Owns the persistent channel of one conversation.
pub struct ChannelManager {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ChannelManager {
    pub fn new(options: ChannelOptions) -> Self {
        let (state, _) = watch::channel(ChannelState::default());
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            shared: Arc::new(Shared {
                options,
                state,
                outbound: Mutex::new(None),
                events_tx,
                events_rx: Arc::new(Mutex::new(events_rx)),
                cancel: CancellationToken::new(),
            }),
            task: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &ChannelOptions {
        &self.shared.options
    }

    /// Queues a frame on the open connection.
    pub async fn send(&self, frame: OutboundFrame) -> Result<(), ChatError> {
        if !self.shared.state.borrow().connected {
            return Err(ChatError::NotConnected);
        }
        let sender = self.shared.outbound.lock().await.clone();
        match sender {
            Some(tx) => tx.send(frame).await.map_err(|_| ChatError::NotConnected),
            None => Err(ChatError::NotConnected),
        }
    }

    /// Sends a user-authored message without waiting for the answer.
    pub async fn send_message(&self, text: &str, context: Option<Value>) -> Result<(), ChatError> {
        self.send(OutboundFrame::Message {
            content: text.to_string(),
            context,
        })
        .await
    }

    /// Tells the agent the visitor started or stopped typing.
    pub async fn send_typing(&self, is_typing: bool) -> Result<(), ChatError> {
        self.send(OutboundFrame::Typing { is_typing }).await
    }
}

#[async_trait]
impl ChatChannel for ChannelManager {
    async fn open(&self, conversation_id: &str) -> Result<(), ChatError> {
        let mut task = self.task.lock().await;
        if self.shared.state.borrow().is_terminal() || self.shared.cancel.is_cancelled() {
            return Err(ChatError::InvalidState(format!(
                "channel is {}",
                self.shared.state.borrow().phase
            )));
        }
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!(conversation_id, "channel already open or connecting");
            return Ok(());
        }

        let url = self.shared.options.conversation_url(conversation_id);
        info!(url = %url, "opening channel");
        self.shared
            .state
            .send_modify(|s| s.phase = ChannelPhase::Connecting);
        let shared = Arc::clone(&self.shared);
        *task = Some(tokio::spawn(async move { shared.run(url).await }));
        Ok(())
    }

    fn state(&self) -> ChannelState {
        *self.shared.state.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<ChannelState> {
        self.shared.state.subscribe()
    }

    /// Sends `text` and returns the agent chunks that follow it.
    ///
    /// Events queued before the send are dropped. Frames carry no turn id,
    /// so a late frame from an earlier turn that already timed out can still
    /// arrive after that drain and be read as part of this turn; a late
    /// `done` then ends this turn early.
    async fn open_turn(&self, text: &str, context: Option<Value>) -> Result<ChunkStream, ChatError> {
        if !self.is_connected() {
            return Err(ChatError::NotConnected);
        }
        let mut rx = Arc::clone(&self.shared.events_rx).lock_owned().await;
        let dropped = drain_stale(&mut rx);
        if dropped > 0 {
            debug!(dropped, "discarded channel events from an earlier turn");
        }
        self.send_message(text, context).await?;
        Ok(turn_stream(rx))
    }

    async fn close(&self) {
        self.shared.cancel.cancel();
        if let Some(handle) = self.task.lock().await.take()
            && let Err(e) = handle.await
        {
            warn!(error = %e, "channel task ended abnormally");
        }
        self.shared.state.send_modify(|s| {
            s.phase = ChannelPhase::Destroyed;
            s.connected = false;
            s.typing = false;
        });
        info!("channel destroyed");
    }
}

impl Shared {
    /// Connect, pump, back off, repeat, until cancelled or out of attempts.
    async fn run(self: Arc<Self>, url: String) {
        let policy = self.options.reconnect.clone();
        let mut attempt: u32 = 0;

        loop {
            self.state.send_modify(|s| s.phase = ChannelPhase::Connecting);
            let connect = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                result = tokio::time::timeout(self.options.connect_timeout, connect_async(url.as_str())) => result,
            };

            match connect {
                Ok(Ok((socket, _response))) => {
                    attempt = 0;
                    let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
                    *self.outbound.lock().await = Some(tx);
                    self.state.send_modify(|s| {
                        s.phase = ChannelPhase::Open;
                        s.connected = true;
                        s.reconnect_attempt = 0;
                    });
                    info!(url = %url, "channel connected");

                    let exit = self.pump(socket, rx).await;

                    *self.outbound.lock().await = None;
                    self.state.send_modify(|s| {
                        s.connected = false;
                        s.typing = false;
                        s.phase = ChannelPhase::Closed;
                    });
                    self.emit(ChannelEvent::Closed);
                    if matches!(exit, PumpExit::Cancelled) {
                        return;
                    }
                    info!("channel closed");
                }
                Ok(Err(e)) => warn!(error = %e, "channel connect failed"),
                Err(_) => warn!(
                    timeout = ?self.options.connect_timeout,
                    "channel connect timed out"
                ),
            }

            attempt = attempt.saturating_add(1);
            if policy.exhausted(attempt) {
                warn!(attempts = attempt - 1, "reconnect attempts exhausted, giving up");
                self.state.send_modify(|s| {
                    s.phase = ChannelPhase::Disconnected;
                    s.reconnect_attempt = attempt - 1;
                });
                return;
            }

            let delay = policy.delay_for(attempt);
            self.state.send_modify(|s| {
                s.phase = ChannelPhase::Closed;
                s.reconnect_attempt = attempt;
            });
            debug!(attempt, delay_ms = delay.as_millis() as u64, "scheduling reconnect");
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn pump(&self, socket: Socket, mut outbound: mpsc::Receiver<OutboundFrame>) -> PumpExit {
        let (mut sink, mut stream) = socket.split();
        let period = self.options.heartbeat_interval;
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    if let Err(e) = sink.send(WsMessage::Close(None)).await {
                        debug!(error = %e, "close frame not delivered");
                    }
                    return PumpExit::Cancelled;
                }
                incoming = stream.next() => match incoming {
                    Some(Ok(WsMessage::Text(text))) => self.dispatch(text.as_str()),
                    Some(Ok(WsMessage::Close(frame))) => {
                        debug!(frame = ?frame, "server closed channel");
                        return PumpExit::Closed;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "channel read failed");
                        return PumpExit::Closed;
                    }
                    None => return PumpExit::Closed,
                },
                _ = heartbeat.tick() => {
                    if let Err(e) = send_frame(&mut sink, &OutboundFrame::Ping).await {
                        warn!(error = %e, "heartbeat ping failed");
                    }
                }
                Some(frame) = outbound.recv() => {
                    if let Err(e) = send_frame(&mut sink, &frame).await {
                        warn!(error = %e, "outbound frame not sent");
                    }
                }
            }
        }
    }

    fn dispatch(&self, text: &str) {
        let Some(frame) = parse_frame(text) else {
            return;
        };
        match frame {
            InboundFrame::Connected { conversation_id } => {
                debug!(conversation_id = ?conversation_id, "channel acknowledged");
            }
            InboundFrame::UserMessage { .. } => {}
            InboundFrame::AgentMessage(AgentPayload { chunk, message }) => {
                self.state.send_if_modified(|s| std::mem::replace(&mut s.typing, false));
                if let Some(chunk) = chunk {
                    self.emit(ChannelEvent::Chunk(chunk));
                } else if let Some(message) = message {
                    self.emit(ChannelEvent::Message(message));
                }
            }
            InboundFrame::Typing { is_typing } => {
                self.state.send_if_modified(|s| {
                    let changed = s.typing != is_typing;
                    s.typing = is_typing;
                    changed
                });
            }
            InboundFrame::Pong => {}
            InboundFrame::Error { message } => {
                let reason = message.unwrap_or_else(|| "agent reported an error".to_string());
                warn!(reason = %reason, "error frame received");
                self.emit(ChannelEvent::Error(reason));
            }
        }
    }

    fn emit(&self, event: ChannelEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            warn!(error = %e, "channel event queue full, dropping event");
        }
    }
}

async fn send_frame<S>(sink: &mut S, frame: &OutboundFrame) -> Result<(), ChatError>
where
    S: futures::Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = frame.to_text()?;
    sink.send(WsMessage::Text(text.into()))
        .await
        .map_err(|e| ChatError::Transport {
            message: "websocket send failed".into(),
            source: Some(Box::new(e)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ChannelOptions {
        ChannelOptions {
            ws_url: "ws://127.0.0.1:9/api/v1/".into(),
            heartbeat_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(1),
            reconnect: ReconnectPolicy::fixed(Duration::from_millis(10)),
        }
    }

    #[test]
    fn conversation_url_joins_cleanly() {
        assert_eq!(
            options().conversation_url("c-1"),
            "ws://127.0.0.1:9/api/v1/conversations/c-1/ws"
        );
    }

    #[test]
    fn options_follow_config() {
        let config = ChatlineConfig::default();
        let options = ChannelOptions::from_config(&config);
        assert_eq!(options.ws_url, "ws://localhost:8000/api/v1");
        assert_eq!(options.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(options.reconnect.base, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn fresh_manager_is_closed_and_rejects_sends() {
        let manager = ChannelManager::new(options());
        assert_eq!(manager.state(), ChannelState::default());
        assert!(matches!(
            manager.send_message("hi", None).await,
            Err(ChatError::NotConnected)
        ));
        assert!(matches!(
            manager.open_turn("hi", None).await,
            Err(ChatError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn closed_manager_cannot_reopen() {
        let manager = ChannelManager::new(options());
        manager.close().await;
        assert_eq!(manager.state().phase, ChannelPhase::Destroyed);
        assert!(matches!(
            manager.open("c-1").await,
            Err(ChatError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn dispatch_tracks_typing() {
        let manager = ChannelManager::new(options());
        manager.shared.dispatch(r#"{"type":"typing","is_typing":true}"#);
        assert!(manager.state().typing);
        manager
            .shared
            .dispatch(r#"{"type":"agent_message","chunk":{"type":"content","content":"x"}}"#);
        assert!(!manager.state().typing);
    }

    #[tokio::test]
    async fn dispatch_ignores_echo_and_garbage() {
        let manager = ChannelManager::new(options());
        manager
            .shared
            .dispatch(r#"{"type":"user_message","message":{"content":"hi"}}"#);
        manager.shared.dispatch("{{{");
        manager.shared.dispatch(r#"{"type":"pong"}"#);
        let mut rx = manager.shared.events_rx.lock().await;
        assert_eq!(drain_stale(&mut rx), 0);
    }
}
