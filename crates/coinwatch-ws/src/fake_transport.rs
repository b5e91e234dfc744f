//! Deterministic in-process transport for tests.
//!
//! Records every frame handed to `send` and lets the test drive the
//! session by emitting events directly. Events are delivered synchronously
//! on the caller's thread.

use crate::error::{WsError, WsResult};
use crate::transport::{CallbackSlot, Transport, TransportCallback, TransportEvent};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
pub struct FakeTransport {
    callback: CallbackSlot,
    sent: Mutex<Vec<String>>,
    connect_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    open_on_connect: AtomicBool,
    reject_sends: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `Open` from inside `connect()`.
    pub fn with_open_on_connect(self) -> Self {
        self.open_on_connect.store(true, Ordering::SeqCst);
        self
    }

    /// Make `send` fail with `SendFailed`.
    pub fn set_reject_sends(&self, reject: bool) {
        self.reject_sends.store(reject, Ordering::SeqCst);
    }

    /// Deliver an event to the registered callback.
    pub fn emit(&self, event: TransportEvent) {
        self.callback.emit(event);
    }

    pub fn emit_open(&self) {
        self.emit(TransportEvent::Open);
    }

    pub fn emit_message(&self, text: impl Into<String>) {
        self.emit(TransportEvent::Message(text.into()));
    }

    pub fn emit_close(&self, code: u16, reason: impl Into<String>) {
        self.emit(TransportEvent::Close {
            code,
            reason: reason.into(),
        });
    }

    pub fn emit_error(&self, message: impl Into<String>) {
        self.emit(TransportEvent::Error(message.into()));
    }

    /// Frames accepted so far, oldest first.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Accepted frames parsed as JSON. Non-JSON frames are skipped.
    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .iter()
            .filter_map(|text| serde_json::from_str(text).ok())
            .collect()
    }

    pub fn clear_sent(&self) {
        self.sent.lock().clear();
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl Transport for FakeTransport {
    fn connect(&self) {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.open_on_connect.load(Ordering::SeqCst) {
            self.emit_open();
        }
    }

    fn send(&self, text: String) -> WsResult<()> {
        if self.reject_sends.load(Ordering::SeqCst) {
            return Err(WsError::SendFailed("rejected by fake transport".to_string()));
        }
        self.sent.lock().push(text);
        Ok(())
    }

    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn set_callback(&self, callback: TransportCallback) {
        self.callback.set(callback);
    }
}
