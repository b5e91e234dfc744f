//! Subscription protocol.
//!
//! Builds SUBSCRIBE/UNSUBSCRIBE envelopes with process-unique ascending
//! ids, and tracks which streams the current session has asked for.

use crate::message::{Envelope, Method};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Envelope builder and active-stream tracker.
///
/// The id counter is shared by subscribe and unsubscribe and is never
/// reset, including across reconnects.
pub struct SubscriptionProtocol {
    next_id: AtomicU64,
    active: RwLock<BTreeSet<String>>,
    subscribes_sent: AtomicU64,
    unsubscribes_sent: AtomicU64,
}

impl SubscriptionProtocol {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            active: RwLock::new(BTreeSet::new()),
            subscribes_sent: AtomicU64::new(0),
            unsubscribes_sent: AtomicU64::new(0),
        }
    }

    fn take_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Build a SUBSCRIBE envelope. Empty `streams` is allowed.
    pub fn build_subscribe(&self, streams: &[String]) -> Envelope {
        Envelope::new(Method::Subscribe, streams.to_vec(), self.take_id())
    }

    /// Build an UNSUBSCRIBE envelope. Empty `streams` is allowed.
    pub fn build_unsubscribe(&self, streams: &[String]) -> Envelope {
        Envelope::new(Method::Unsubscribe, streams.to_vec(), self.take_id())
    }

    /// Id the next envelope will get.
    pub fn peek_next_id(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }

    /// Update the active set after an envelope went out.
    pub fn record_sent(&self, envelope: &Envelope) {
        let mut active = self.active.write();
        match envelope.method {
            Method::Subscribe => {
                self.subscribes_sent.fetch_add(1, Ordering::Relaxed);
                for stream in &envelope.params {
                    active.insert(stream.clone());
                }
            }
            Method::Unsubscribe => {
                self.unsubscribes_sent.fetch_add(1, Ordering::Relaxed);
                for stream in &envelope.params {
                    active.remove(stream);
                }
            }
        }
        debug!(
            id = envelope.id,
            method = %envelope.method,
            active = active.len(),
            "Active streams updated"
        );
    }

    /// Envelopes of `method` recorded as sent.
    pub fn sent_count(&self, method: Method) -> u64 {
        match method {
            Method::Subscribe => self.subscribes_sent.load(Ordering::Relaxed),
            Method::Unsubscribe => self.unsubscribes_sent.load(Ordering::Relaxed),
        }
    }

    /// Streams requested on the current session, sorted.
    pub fn active_streams(&self) -> Vec<String> {
        self.active.read().iter().cloned().collect()
    }

    pub fn is_active(&self, stream: &str) -> bool {
        self.active.read().contains(stream)
    }

    /// Forget all streams (the server drops them when the session ends).
    pub fn reset_active(&self) {
        self.active.write().clear();
    }
}

impl Default for SubscriptionProtocol {
    fn default() -> Self {
        Self::new()
    }
}
