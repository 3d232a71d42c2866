// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persistent WebSocket session: connect, reconnect with jittered
//! backoff, liveness ping/pong, frame demux, bounded send queues.
//!
//! The connection handle lives behind the session for its whole lifetime,
//! and callers only ever see the narrow `send_*`/`stop` surface, never the
//! raw socket.

use crate::backoff::{Backoff, BackoffRng, ThreadRngBackoff};
use crate::frame::{classify_inbound, encode_binary_frame, encode_result_frame, encode_stream_frame, InboundFrame, RawInboundFrame, TransportError};
use breeze_core::{Command, CommandResult};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

const TEXT_QUEUE_DEPTH: usize = 256;
const BINARY_QUEUE_DEPTH: usize = 30;
const READ_DEADLINE: Duration = Duration::from_secs(60);
const PING_INTERVAL: Duration = Duration::from_secs(54);
const WRITE_DEADLINE: Duration = Duration::from_secs(10);
const MAX_MESSAGE_SIZE: usize = 512 * 1024;

/// Callback invoked once per inbound command frame. Expected to be
/// non-blocking: a dispatcher implementation submits to its worker pool and
/// returns immediately rather than running the handler inline.
pub type OnCommand = Arc<dyn Fn(Command) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ws_url: Url,
    pub text_queue_depth: usize,
    pub binary_queue_depth: usize,
    pub read_deadline: Duration,
    pub ping_interval: Duration,
    pub write_deadline: Duration,
    pub max_message_size: usize,
}

impl SessionConfig {
    pub fn new(ws_url: Url) -> Self {
        Self {
            ws_url,
            text_queue_depth: TEXT_QUEUE_DEPTH,
            binary_queue_depth: BINARY_QUEUE_DEPTH,
            read_deadline: READ_DEADLINE,
            ping_interval: PING_INTERVAL,
            write_deadline: WRITE_DEADLINE,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

struct Shared {
    stopped: AtomicBool,
    stop_notify: Notify,
}

/// A persistent, reconnecting WebSocket session to the server.
pub struct Session {
    text_tx: mpsc::Sender<serde_json::Value>,
    binary_tx: mpsc::Sender<Vec<u8>>,
    shared: Arc<Shared>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Starts the reconnect loop in the background and returns a handle to
    /// it. The loop runs until [`Session::stop`] is called.
    pub fn start(config: SessionConfig, on_command: OnCommand) -> Self {
        Self::start_with_rng(config, on_command, Arc::new(ThreadRngBackoff))
    }

    pub fn start_with_rng(config: SessionConfig, on_command: OnCommand, rng: Arc<dyn BackoffRng>) -> Self {
        let (text_tx, text_rx) = mpsc::channel(config.text_queue_depth);
        let (binary_tx, binary_rx) = mpsc::channel(config.binary_queue_depth);
        let shared = Arc::new(Shared {
            stopped: AtomicBool::new(false),
            stop_notify: Notify::new(),
        });

        let loop_handle = tokio::spawn(connect_loop(config, shared.clone(), on_command, rng, text_rx, binary_rx));

        Self {
            text_tx,
            binary_tx,
            shared,
            loop_handle: Mutex::new(Some(loop_handle)),
        }
    }

    /// Enqueues a `command_result` frame. Non-blocking; returns
    /// [`TransportError::QueueFull`] if the text queue is saturated.
    pub fn send_result(&self, result: &CommandResult) -> Result<(), TransportError> {
        self.text_tx
            .try_send(encode_result_frame(result))
            .map_err(|_| TransportError::QueueFull)
    }

    /// Enqueues a binary frame (`0x02 || 36-byte session id || payload`).
    pub fn send_binary(&self, session_id: &str, payload: &[u8]) -> Result<(), TransportError> {
        let frame = encode_binary_frame(session_id, payload)?;
        self.binary_tx
            .try_send(frame)
            .map_err(|_| TransportError::QueueFull)
    }

    /// Enqueues a structured stream frame on the text queue.
    pub fn send_stream(&self, session_id: &str, data: &serde_json::Value) -> Result<(), TransportError> {
        self.text_tx
            .try_send(encode_stream_frame(session_id, data))
            .map_err(|_| TransportError::QueueFull)
    }

    /// Idempotent. Signals the reconnect loop to stop retrying and close the
    /// live connection; does not wait for it to finish (see
    /// [`Session::stop_and_wait`]).
    pub fn stop(&self) {
        self.shared.stopped.store(true, Ordering::Release);
        self.shared.stop_notify.notify_waiters();
    }

    /// `stop` followed by waiting for the reconnect loop task to exit.
    pub async fn stop_and_wait(&self) {
        self.stop();
        let handle = self.loop_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::Acquire)
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum ControlMsg {
    Pong(Vec<u8>),
}

enum DisconnectReason {
    Stopped,
    WriteFailed,
    ReaderEnded,
}

async fn connect_loop(
    config: SessionConfig,
    shared: Arc<Shared>,
    on_command: OnCommand,
    rng: Arc<dyn BackoffRng>,
    mut text_rx: mpsc::Receiver<serde_json::Value>,
    mut binary_rx: mpsc::Receiver<Vec<u8>>,
) {
    let mut backoff = Backoff::new();

    loop {
        if shared.stopped.load(Ordering::Acquire) {
            return;
        }

        let connect_result = tokio_tungstenite::connect_async(config.ws_url.as_str()).await;
        let ws_stream = match connect_result {
            Ok((stream, _response)) => stream,
            Err(err) => {
                tracing::warn!(error = %err, "connect failed; backing off");
                tokio::time::sleep(backoff.next_delay(rng.as_ref())).await;
                continue;
            }
        };

        tracing::info!("connected");
        backoff.reset();

        let (mut sink, stream) = ws_stream.split();
        let (control_tx, mut control_rx) = mpsc::unbounded_channel();

        let mut reader_handle: JoinHandle<()> = tokio::spawn(reader_loop(
            stream,
            on_command.clone(),
            control_tx,
            config.read_deadline,
            config.max_message_size,
        ));

        let mut ping_interval = tokio::time::interval(config.ping_interval);
        ping_interval.tick().await;

        let reason = loop {
            if shared.stopped.load(Ordering::Acquire) {
                break DisconnectReason::Stopped;
            }
            tokio::select! {
                _ = shared.stop_notify.notified() => {
                    break DisconnectReason::Stopped;
                }
                maybe_text = text_rx.recv() => {
                    match maybe_text {
                        Some(value) => {
                            if send_text(&mut sink, &value, config.write_deadline).await.is_err() {
                                break DisconnectReason::WriteFailed;
                            }
                        }
                        None => break DisconnectReason::Stopped,
                    }
                }
                maybe_binary = binary_rx.recv() => {
                    match maybe_binary {
                        Some(frame) => {
                            if send_raw(&mut sink, Message::Binary(frame), config.write_deadline).await.is_err() {
                                break DisconnectReason::WriteFailed;
                            }
                        }
                        None => break DisconnectReason::Stopped,
                    }
                }
                maybe_control = control_rx.recv() => {
                    if let Some(ControlMsg::Pong(payload)) = maybe_control {
                        if send_raw(&mut sink, Message::Pong(payload), config.write_deadline).await.is_err() {
                            break DisconnectReason::WriteFailed;
                        }
                    }
                }
                _ = ping_interval.tick() => {
                    if send_raw(&mut sink, Message::Ping(Vec::new()), config.write_deadline).await.is_err() {
                        break DisconnectReason::WriteFailed;
                    }
                }
                _ = &mut reader_handle => {
                    break DisconnectReason::ReaderEnded;
                }
            }
        };

        reader_handle.abort();
        let _ = sink.close().await;

        if matches!(reason, DisconnectReason::Stopped) {
            return;
        }
        tracing::warn!("connection lost; reconnecting");
        tokio::time::sleep(backoff.next_delay(rng.as_ref())).await;
    }
}

async fn reader_loop(
    mut stream: futures_util::stream::SplitStream<WsStream>,
    on_command: OnCommand,
    control_tx: mpsc::UnboundedSender<ControlMsg>,
    read_deadline: Duration,
    max_message_size: usize,
) {
    loop {
        let next = tokio::time::timeout(read_deadline, stream.next()).await;
        let message = match next {
            Err(_elapsed) => {
                tracing::warn!("read deadline exceeded");
                return;
            }
            Ok(None) => {
                tracing::info!("connection closed by peer");
                return;
            }
            Ok(Some(Err(err))) => {
                tracing::warn!(error = %err, "websocket read error");
                return;
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => {
                if text.len() > max_message_size {
                    tracing::warn!(len = text.len(), "inbound message exceeds max size; dropping");
                    continue;
                }
                match serde_json::from_str::<RawInboundFrame>(&text) {
                    Ok(raw) => match classify_inbound(raw) {
                        InboundFrame::Command(cmd) => (on_command)(cmd),
                        InboundFrame::Control { kind } => tracing::debug!(kind, "control frame"),
                    },
                    Err(err) => tracing::warn!(error = %err, "failed to parse inbound frame; dropping"),
                }
            }
            Message::Binary(_) => tracing::debug!("dropping unexpected inbound binary frame"),
            Message::Ping(payload) => {
                let _ = control_tx.send(ControlMsg::Pong(payload));
            }
            Message::Pong(_) => {}
            Message::Close(frame) => {
                if let Some(frame) = &frame {
                    if !matches!(frame.code, CloseCode::Normal | CloseCode::Away) {
                        tracing::warn!(code = ?frame.code, reason = %frame.reason, "unexpected close code");
                    }
                }
                return;
            }
            // Catch-all for variants only ever produced by the low-level
            // frame API, never by `stream.next()` on a live connection.
            _ => {}
        }
    }
}

async fn send_text(
    sink: &mut futures_util::stream::SplitSink<WsStream, Message>,
    value: &serde_json::Value,
    write_deadline: Duration,
) -> Result<(), ()> {
    send_raw(sink, Message::Text(value.to_string()), write_deadline).await
}

async fn send_raw(
    sink: &mut futures_util::stream::SplitSink<WsStream, Message>,
    message: Message,
    write_deadline: Duration,
) -> Result<(), ()> {
    match tokio::time::timeout(write_deadline, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "websocket write failed");
            Err(())
        }
        Err(_elapsed) => {
            tracing::warn!("write deadline exceeded");
            Err(())
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
