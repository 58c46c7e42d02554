//! Push channel: one long-lived WebSocket to the realtime endpoint.
//!
//! The connection runs as a background task that reconnects on its own.
//! Callers see state transitions and decoded server events, in arrival
//! order, through [`PushChannel::next_event`]. Outbound commands are
//! fire-and-forget; their outcome comes back later as a broadcast or an
//! `erro` event.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use stockcart_types::{ClientCommand, Frame, ServerEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// What the channel delivers to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    State(ConnectionState),
    Server(ServerEvent),
}

/// Reconnection timing owned by the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(25),
        }
    }
}

/// Where mutation commands go.
pub trait CommandSink {
    fn is_connected(&self) -> bool;

    /// Queues `command`; `false` when it was dropped.
    fn emit(&self, command: ClientCommand) -> bool;
}

pub struct PushChannel {
    endpoint: String,
    state: watch::Receiver<ConnectionState>,
    outbound: mpsc::UnboundedSender<ClientCommand>,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    task: JoinHandle<()>,
}

impl PushChannel {
    /// Starts connecting in the background and returns immediately.
    pub fn connect(endpoint: impl Into<String>, policy: ReconnectPolicy) -> Self {
        let endpoint = endpoint.into();
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_connection(
            endpoint.clone(),
            policy,
            state_tx,
            events_tx,
            outbound_rx,
        ));

        Self {
            endpoint,
            state,
            outbound,
            events,
            task,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Next event in arrival order. `None` only once the connection task is gone.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }

    /// Waits until the channel reports `Connected`, up to `timeout`.
    pub async fn wait_connected(&self, timeout: Duration) -> bool {
        let mut state = self.state.clone();
        let reached = tokio::time::timeout(
            timeout,
            state.wait_for(|s| *s == ConnectionState::Connected),
        )
        .await
        .is_ok_and(|r| r.is_ok());
        reached
    }

    /// Tears the connection down. Nothing is delivered afterwards.
    pub fn close(self) {
        debug!(endpoint = %self.endpoint, "closing push channel");
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.task.abort();
        self.events.close();
    }
}

impl CommandSink for PushChannel {
    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    fn emit(&self, command: ClientCommand) -> bool {
        if !self.is_connected() {
            debug!(event = command.event_name(), "dropping command while disconnected");
            return false;
        }
        self.outbound.send(command).is_ok()
    }
}

enum SessionEnd {
    /// The socket closed or failed; reconnect.
    Dropped,
    /// The owning `PushChannel` is gone; stop.
    OwnerGone,
}

async fn run_connection(
    endpoint: String,
    policy: ReconnectPolicy,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: mpsc::UnboundedSender<ChannelEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientCommand>,
) {
    let mut backoff = policy.initial_delay;

    loop {
        match connect_async(endpoint.as_str()).await {
            Ok((ws_stream, _)) => {
                backoff = policy.initial_delay;

                // Commands queued against a previous connection are not replayed.
                let mut stale = 0usize;
                while outbound_rx.try_recv().is_ok() {
                    stale += 1;
                }
                if stale > 0 {
                    debug!(count = stale, "discarded commands queued before reconnect");
                }

                info!(%endpoint, "push channel connected");
                state_tx.send_replace(ConnectionState::Connected);
                if events_tx
                    .send(ChannelEvent::State(ConnectionState::Connected))
                    .is_err()
                {
                    return;
                }

                let end = stream_session(ws_stream, &policy, &events_tx, &mut outbound_rx).await;

                state_tx.send_replace(ConnectionState::Disconnected);
                if let SessionEnd::OwnerGone = end {
                    return;
                }
                warn!(%endpoint, "push channel disconnected");
                if events_tx
                    .send(ChannelEvent::State(ConnectionState::Disconnected))
                    .is_err()
                {
                    return;
                }
            }
            Err(e) => {
                warn!(
                    %endpoint,
                    backoff_ms = backoff.as_millis() as u64,
                    "push channel connect failed: {e}"
                );
            }
        }

        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(policy.max_delay);
    }
}

async fn stream_session<S>(
    ws_stream: tokio_tungstenite::WebSocketStream<S>,
    policy: &ReconnectPolicy,
    events_tx: &mpsc::UnboundedSender<ChannelEvent>,
    outbound_rx: &mut mpsc::UnboundedReceiver<ClientCommand>,
) -> SessionEnd
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = ws_stream.split();
    let mut heartbeat = interval_at(
        Instant::now() + policy.heartbeat_interval,
        policy.heartbeat_interval,
    );

    loop {
        tokio::select! {
            command = outbound_rx.recv() => {
                let Some(command) = command else {
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionEnd::OwnerGone;
                };
                let text = match command.to_frame().and_then(|f| f.to_text()) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(event = command.event_name(), "failed to encode command: {e}");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    return SessionEnd::Dropped;
                }
                debug!(event = command.event_name(), "command sent");
            }
            _ = heartbeat.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    return SessionEnd::Dropped;
                }
            }
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Some(event) = decode_event(text.as_str()) else {
                            continue;
                        };
                        if events_tx.send(ChannelEvent::Server(event)).is_err() {
                            return SessionEnd::OwnerGone;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::Dropped,
                    Some(Err(e)) => {
                        debug!("push channel read failed: {e}");
                        return SessionEnd::Dropped;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Decodes one text frame; unknown events and garbage are logged and skipped.
pub fn decode_event(text: &str) -> Option<ServerEvent> {
    let frame = match Frame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("undecodable push frame: {e}");
            return None;
        }
    };
    match ServerEvent::from_frame(&frame) {
        Ok(Some(event)) => Some(event),
        Ok(None) => {
            debug!(event = %frame.event, "ignoring unknown push event");
            None
        }
        Err(e) => {
            warn!(event = %frame.event, "malformed push payload: {e}");
            None
        }
    }
}
