//! Transport abstraction.
//!
//! The connection never touches sockets directly. A transport owns the
//! websocket session and reports everything that happens to it through a
//! single callback, invoked on the transport's own task.

use crate::error::WsResult;
use parking_lot::RwLock;
use std::sync::Arc;

/// Event delivered by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Session is open and frames can be sent.
    Open,
    /// Text frame received.
    Message(String),
    /// Session closed, by either side.
    Close { code: u16, reason: String },
    /// Session failed; no further events follow for this session.
    Error(String),
    /// Server ping received (the transport replies on its own).
    Ping,
}

impl TransportEvent {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Message(_) => "message",
            Self::Close { .. } => "close",
            Self::Error(_) => "error",
            Self::Ping => "ping",
        }
    }
}

/// Callback receiving transport events.
pub type TransportCallback = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Websocket session provider.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Start opening a session. Returns immediately; the outcome arrives as
    /// `Open` or `Error`.
    fn connect(&self);

    /// Queue a text frame. Never waits for the frame to be written.
    fn send(&self, text: String) -> WsResult<()>;

    /// Tear the session down (or abandon a pending open).
    fn stop(&self);

    /// Replace the event callback.
    fn set_callback(&self, callback: TransportCallback);
}

/// Shared callback slot used by transport implementations.
#[derive(Clone, Default)]
pub(crate) struct CallbackSlot(Arc<RwLock<Option<TransportCallback>>>);

impl CallbackSlot {
    pub(crate) fn set(&self, callback: TransportCallback) {
        *self.0.write() = Some(callback);
    }

    /// Invoke the callback outside the slot lock.
    pub(crate) fn emit(&self, event: TransportEvent) {
        let callback = self.0.read().clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_event_kind_labels() {
        assert_eq!(TransportEvent::Open.kind(), "open");
        assert_eq!(TransportEvent::Message("{}".into()).kind(), "message");
        assert_eq!(
            TransportEvent::Close {
                code: 1000,
                reason: String::new()
            }
            .kind(),
            "close"
        );
        assert_eq!(TransportEvent::Error("x".into()).kind(), "error");
        assert_eq!(TransportEvent::Ping.kind(), "ping");
    }

    #[test]
    fn test_callback_slot_emits_to_latest_callback() {
        let slot = CallbackSlot::default();
        slot.emit(TransportEvent::Open); // no callback yet, dropped

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        slot.set(Arc::new(move |event| sink.lock().push(event)));

        slot.emit(TransportEvent::Ping);
        assert_eq!(*seen.lock(), vec![TransportEvent::Ping]);
    }
}
