//! Mock Binance stream server for integration tests.
//!
//! Provides a simple WebSocket server that can:
//! - Accept connections
//! - Acknowledge SUBSCRIBE/UNSUBSCRIBE with `{"result":null,"id":n}`
//! - Push one trade per newly subscribed `@trade` stream
//! - Record received messages

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Price pushed for every subscribed trade stream.
pub const MOCK_TRADE_PRICE: &str = "101.25";

/// A mock stream server for testing.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    messages: Arc<Mutex<VecDeque<String>>>,
    connections: Arc<Mutex<u32>>,
}

impl MockWsServer {
    /// Start a new mock server on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let messages: Arc<Mutex<VecDeque<String>>> = Arc::new(Mutex::new(VecDeque::new()));
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let messages_clone = messages.clone();
        let connections_clone = connections.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let messages = messages_clone.clone();
                        let connections = connections_clone.clone();
                        tokio::spawn(handle_connection(stream, messages, connections));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            messages,
            connections,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Get the number of connections received.
    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Get all received text messages.
    pub async fn received_messages(&self) -> Vec<String> {
        self.messages.lock().await.iter().cloned().collect()
    }

    /// Received messages parsed as JSON envelopes.
    pub async fn received_envelopes(&self) -> Vec<Value> {
        self.received_messages()
            .await
            .iter()
            .filter_map(|m| serde_json::from_str(m).ok())
            .collect()
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Trade frame in the exchange's format (upper-case symbol).
pub fn trade_frame(symbol: &str, trade_id: i64, price: &str) -> String {
    json!({
        "e": "trade",
        "E": 1_700_000_000_000i64 + trade_id,
        "s": symbol.to_ascii_uppercase(),
        "t": trade_id,
        "p": price,
        "q": "0.5",
        "T": 1_700_000_000_000i64 + trade_id,
        "m": false,
        "M": true
    })
    .to_string()
}

async fn handle_connection(
    stream: TcpStream,
    messages: Arc<Mutex<VecDeque<String>>>,
    connections: Arc<Mutex<u32>>,
) {
    {
        let mut count = connections.lock().await;
        *count += 1;
    }

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();
    let mut next_trade_id = 1;

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                {
                    let mut msgs = messages.lock().await;
                    msgs.push_back(text.clone());
                }

                let Ok(parsed) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                let Some(id) = parsed.get("id").cloned() else {
                    continue;
                };

                let ack = json!({"result": null, "id": id});
                if write.send(Message::Text(ack.to_string())).await.is_err() {
                    break;
                }

                if parsed.get("method") != Some(&json!("SUBSCRIBE")) {
                    continue;
                }
                let streams = parsed
                    .get("params")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                for stream in streams.iter().filter_map(Value::as_str) {
                    if let Some(symbol) = stream.strip_suffix("@trade") {
                        let frame = trade_frame(symbol, next_trade_id, MOCK_TRADE_PRICE);
                        next_trade_id += 1;
                        let _ = write.send(Message::Text(frame)).await;
                    }
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockWsServer::start().await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.shutdown().await;
    }

    #[test]
    fn test_trade_frame_uses_exchange_casing() {
        let frame: Value = serde_json::from_str(&trade_frame("btcusdt", 7, "1.5")).unwrap();
        assert_eq!(frame["s"], json!("BTCUSDT"));
        assert_eq!(frame["t"], json!(7));
        assert_eq!(frame["p"], json!("1.5"));
    }
}
