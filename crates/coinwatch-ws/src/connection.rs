//! Exchange connection.
//!
//! Owns the transport session and its state machine:
//!
//! ```text
//! Disconnected --connect()--> Connecting --Open--> Connected
//! Connected --disconnect() | Close | Error--> Disconnected
//! ```
//!
//! `Error` forces `Disconnected` from any state. There is no reconnection;
//! callers decide whether to `connect()` again. Nothing here returns an
//! error to the caller: every skip path is reported through `Diagnostics`.

use crate::message::{Envelope, Method};
use crate::subscription::SubscriptionProtocol;
use crate::transport::{Transport, TransportEvent};
use coinwatch_core::{category, Diagnostics, Severity};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub const ALL: [ConnectionState; 3] = [
        ConnectionState::Disconnected,
        ConnectionState::Connecting,
        ConnectionState::Connected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consumer of inbound text frames.
///
/// Called on the transport's task; must not block.
pub trait MessageHandler: Send + Sync {
    fn handle_frame(&self, frame: &str);
}

/// State shared with the transport callback.
struct Shared {
    state: RwLock<ConnectionState>,
    handler: RwLock<Option<Arc<dyn MessageHandler>>>,
    protocol: SubscriptionProtocol,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Shared {
    fn diag(&self, severity: Severity, message: &str) {
        self.diagnostics
            .record(severity, category::CONNECTION, message);
    }
}

/// Exchange connection.
pub struct Connection {
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
}

impl Connection {
    /// Wrap a transport. Registers the connection's event callback on it.
    pub fn new(transport: Arc<dyn Transport>, diagnostics: Arc<dyn Diagnostics>) -> Self {
        let shared = Arc::new(Shared {
            state: RwLock::new(ConnectionState::Disconnected),
            handler: RwLock::new(None),
            protocol: SubscriptionProtocol::new(),
            diagnostics,
        });

        let callback_shared = shared.clone();
        transport.set_callback(Arc::new(move |event| {
            handle_event(&callback_shared, event);
        }));

        Self { transport, shared }
    }

    /// Start opening a session. Returns immediately.
    pub fn connect(&self) {
        {
            let mut state = self.shared.state.write();
            if *state != ConnectionState::Disconnected {
                let message = format!("connect() ignored while {}", *state);
                drop(state);
                self.shared.diag(Severity::Warning, &message);
                return;
            }
            *state = ConnectionState::Connecting;
        }
        self.shared.diag(Severity::Info, "connecting");
        self.transport.connect();
    }

    /// Tear the session down. No-op when already disconnected.
    pub fn disconnect(&self) {
        let previous = {
            let mut state = self.shared.state.write();
            std::mem::replace(&mut *state, ConnectionState::Disconnected)
        };
        if previous == ConnectionState::Disconnected {
            self.shared
                .diag(Severity::Debug, "disconnect() while already disconnected");
            return;
        }

        self.shared.protocol.reset_active();
        self.transport.stop();
        self.shared
            .diag(Severity::Info, &format!("disconnected (was {previous})"));
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.read()
    }

    /// Send a text frame. Returns whether the transport accepted it.
    ///
    /// Frames are never queued while disconnected.
    pub fn send(&self, payload: String) -> bool {
        if !self.is_connected() {
            self.shared.diag(
                Severity::Warning,
                &format!("send skipped, not connected: {payload}"),
            );
            return false;
        }

        match self.transport.send(payload) {
            Ok(()) => true,
            Err(e) => {
                self.shared
                    .diag(Severity::Error, &format!("send failed: {e}"));
                false
            }
        }
    }

    /// Send a SUBSCRIBE envelope. Returns the envelope id.
    pub fn subscribe_to_streams(&self, streams: &[String]) -> u64 {
        let envelope = self.shared.protocol.build_subscribe(streams);
        self.send_envelope(envelope)
    }

    /// Send an UNSUBSCRIBE envelope. Returns the envelope id.
    pub fn unsubscribe_from_streams(&self, streams: &[String]) -> u64 {
        let envelope = self.shared.protocol.build_unsubscribe(streams);
        self.send_envelope(envelope)
    }

    fn send_envelope(&self, envelope: Envelope) -> u64 {
        let id = envelope.id;
        let text = match envelope.to_json() {
            Ok(text) => text,
            Err(e) => {
                self.shared.diagnostics.record(
                    Severity::Error,
                    category::SUBSCRIPTION,
                    &format!("failed to encode envelope {id}: {e}"),
                );
                return id;
            }
        };

        if self.send(text) {
            self.shared.protocol.record_sent(&envelope);
            self.shared.diagnostics.record(
                Severity::Info,
                category::SUBSCRIPTION,
                &format!(
                    "{} id={} streams={:?}",
                    envelope.method, id, envelope.params
                ),
            );
        }
        id
    }

    /// Register the inbound frame consumer, replacing any previous one.
    pub fn set_message_handler(&self, handler: Arc<dyn MessageHandler>) {
        *self.shared.handler.write() = Some(handler);
    }

    /// Streams subscribed on the current session, sorted.
    pub fn active_streams(&self) -> Vec<String> {
        self.shared.protocol.active_streams()
    }

    /// Envelopes of `method` accepted by the transport so far.
    pub fn envelopes_sent(&self, method: Method) -> u64 {
        self.shared.protocol.sent_count(method)
    }

    /// Id the next envelope will carry.
    pub fn next_request_id(&self) -> u64 {
        self.shared.protocol.peek_next_id()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .field("next_request_id", &self.next_request_id())
            .finish_non_exhaustive()
    }
}

/// Apply one transport event to the connection state.
fn handle_event(shared: &Shared, event: TransportEvent) {
    match event {
        TransportEvent::Open => {
            let opened = {
                let mut state = shared.state.write();
                if *state == ConnectionState::Connecting {
                    *state = ConnectionState::Connected;
                    true
                } else {
                    false
                }
            };
            if opened {
                shared.diag(Severity::Info, "connected");
            } else {
                shared.diag(Severity::Warning, "open event ignored, not connecting");
            }
        }
        TransportEvent::Message(text) => {
            let handler = shared.handler.read().clone();
            match handler {
                Some(handler) => handler.handle_frame(&text),
                None => shared.diag(Severity::Warning, "frame dropped, no message handler"),
            }
        }
        TransportEvent::Close { code, reason } => {
            let previous = {
                let mut state = shared.state.write();
                std::mem::replace(&mut *state, ConnectionState::Disconnected)
            };
            shared.protocol.reset_active();
            let severity = if previous == ConnectionState::Disconnected {
                Severity::Debug
            } else {
                Severity::Warning
            };
            shared.diag(
                severity,
                &format!("closed code={code} reason={reason} (was {previous})"),
            );
        }
        TransportEvent::Error(message) => {
            *shared.state.write() = ConnectionState::Disconnected;
            shared.protocol.reset_active();
            shared.diag(Severity::Error, &format!("transport error: {message}"));
        }
        TransportEvent::Ping => shared.diag(Severity::Debug, "ping received"),
    }
}
