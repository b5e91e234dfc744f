//! Websocket client for the exchange trade streams.
//!
//! - `Connection`: session state machine, send/receive primitives
//! - `SubscriptionProtocol`: SUBSCRIBE/UNSUBSCRIBE envelopes with ascending ids
//! - `Transport`: session provider trait, with a tokio-tungstenite
//!   implementation and an in-process fake for tests

pub mod connection;
pub mod error;
pub mod fake_transport;
pub mod message;
pub mod subscription;
pub mod transport;
pub mod ws_transport;

pub use connection::{Connection, ConnectionState, MessageHandler};
pub use error::{WsError, WsResult};
pub use fake_transport::FakeTransport;
pub use message::{Envelope, Method};
pub use subscription::SubscriptionProtocol;
pub use transport::{Transport, TransportCallback, TransportEvent};
pub use ws_transport::{TransportConfig, TungsteniteTransport};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any websocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
