//! tokio-tungstenite transport.
//!
//! One session task per `connect()`. The task owns the socket, replies to
//! server pings, sends its own ping every `ping_interval_secs`, and drains a
//! bounded outbound queue. `send()` only enqueues.

use crate::error::{WsError, WsResult};
use crate::transport::{CallbackSlot, Transport, TransportCallback, TransportEvent};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Websocket URL (`ws://` or `wss://`).
    pub url: String,
    /// Upper bound on the opening handshake.
    pub handshake_timeout_ms: u64,
    /// Interval between client pings.
    pub ping_interval_secs: u64,
    /// Capacity of the outbound frame queue.
    pub outbound_buffer: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "wss://stream.binance.com:9443/ws".to_string(),
            handshake_timeout_ms: 10_000,
            ping_interval_secs: 20,
            outbound_buffer: 100,
        }
    }
}

struct Session {
    outbound_tx: mpsc::Sender<Message>,
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

/// Websocket transport backed by tokio-tungstenite.
pub struct TungsteniteTransport {
    config: TransportConfig,
    runtime: Handle,
    callback: CallbackSlot,
    session: Mutex<Option<Session>>,
}

impl TungsteniteTransport {
    /// Create a transport bound to the current tokio runtime.
    pub fn new(config: TransportConfig) -> WsResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| WsError::ConnectionFailed(format!("no tokio runtime: {e}")))?;
        Ok(Self {
            config,
            runtime,
            callback: CallbackSlot::default(),
            session: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Whether a session task exists (open or still handshaking).
    pub fn has_session(&self) -> bool {
        self.session.lock().is_some()
    }
}

impl Transport for TungsteniteTransport {
    fn connect(&self) {
        let mut session = self.session.lock();
        if let Some(old) = session.take() {
            old.cancel.cancel();
        }

        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.outbound_buffer.max(1));
        let cancel = CancellationToken::new();
        let task = self.runtime.spawn(run_session(
            self.config.clone(),
            outbound_rx,
            cancel.clone(),
            self.callback.clone(),
        ));

        *session = Some(Session {
            outbound_tx,
            cancel,
            _task: task,
        });
    }

    fn send(&self, text: String) -> WsResult<()> {
        let tx = self
            .session
            .lock()
            .as_ref()
            .map(|s| s.outbound_tx.clone())
            .ok_or(WsError::NotConnected)?;

        tx.try_send(Message::Text(text)).map_err(|e| match e {
            TrySendError::Full(_) => WsError::SendFailed("outbound queue full".to_string()),
            TrySendError::Closed(_) => WsError::NotConnected,
        })
    }

    fn stop(&self) {
        if let Some(session) = self.session.lock().take() {
            debug!("Stopping websocket session");
            session.cancel.cancel();
        }
    }

    fn set_callback(&self, callback: TransportCallback) {
        self.callback.set(callback);
    }
}

impl Drop for TungsteniteTransport {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.cancel.cancel();
        }
    }
}

/// Session task: report the outcome of the session through the callback.
///
/// A cancelled session emits nothing, so a stale task can never disturb
/// the state of a newer one.
async fn run_session(
    config: TransportConfig,
    outbound_rx: mpsc::Receiver<Message>,
    cancel: CancellationToken,
    callback: CallbackSlot,
) {
    match session_loop(&config, outbound_rx, &cancel, &callback).await {
        Ok(Some((code, reason))) => {
            info!(code, %reason, "Websocket session closed");
            callback.emit(TransportEvent::Close { code, reason });
        }
        Ok(None) => debug!("Websocket session cancelled"),
        Err(e) => {
            if cancel.is_cancelled() {
                debug!(?e, "Websocket error after cancellation");
                return;
            }
            warn!(?e, "Websocket session failed");
            callback.emit(TransportEvent::Error(e.to_string()));
        }
    }
}

/// Emit `Open` unless the session was stopped while its handshake was
/// finishing. Returns whether the session should continue.
fn announce_open(cancel: &CancellationToken, callback: &CallbackSlot) -> bool {
    if cancel.is_cancelled() {
        debug!("Handshake completed after stop, dropping session");
        return false;
    }
    info!("Websocket connected");
    callback.emit(TransportEvent::Open);
    true
}

/// Returns `Ok(Some(close))` when the peer ends the session, `Ok(None)`
/// when cancelled locally.
async fn session_loop(
    config: &TransportConfig,
    mut outbound_rx: mpsc::Receiver<Message>,
    cancel: &CancellationToken,
    callback: &CallbackSlot,
) -> WsResult<Option<(u16, String)>> {
    info!(url = %config.url, "Connecting to websocket");

    let handshake_timeout = Duration::from_millis(config.handshake_timeout_ms);
    // TCP_NODELAY on
    let handshake = connect_async_tls_with_config(config.url.as_str(), None, true, None);
    let ws_stream = tokio::select! {
        () = cancel.cancelled() => return Ok(None),
        result = tokio::time::timeout(handshake_timeout, handshake) => match result {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(WsError::HandshakeTimeout(config.handshake_timeout_ms)),
        },
    };
    if !announce_open(cancel, callback) {
        return Ok(None);
    }
    let (mut write, mut read) = ws_stream.split();

    let ping_period = Duration::from_secs(config.ping_interval_secs.max(1));
    let mut ping_timer = tokio::time::interval_at(tokio::time::Instant::now() + ping_period, ping_period);

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                // Flush frames queued before the stop, e.g. final UNSUBSCRIBEs
                while let Ok(frame) = outbound_rx.try_recv() {
                    if let Err(e) = write.send(frame).await {
                        debug!(?e, "Failed to flush outbound frame during shutdown");
                        return Ok(None);
                    }
                }
                if let Err(e) = write.send(Message::Close(None)).await {
                    debug!(?e, "Failed to send Close frame during shutdown");
                }
                return Ok(None);
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        callback.emit(TransportEvent::Message(text));
                    }
                    Some(Ok(Message::Ping(data))) => {
                        callback.emit(TransportEvent::Ping);
                        write.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (f.code.into(), f.reason.to_string()))
                            .unwrap_or((1000, "Normal close".to_string()));
                        return Ok(Some((code, reason)));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(Some((1006, "Stream ended".to_string()))),
                }
            }

            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(frame) => write.send(frame).await?,
                    None => return Ok(None),
                }
            }

            _ = ping_timer.tick() => {
                write.send(Message::Ping(Vec::new())).await?;
                debug!("Sent websocket ping");
            }
        }
    }
}
