//! End-to-end lifecycle tests.
//!
//! Runs the application pipeline over the real websocket transport against
//! a local mock server:
//! - Connection establishment
//! - Subscription envelopes and acknowledgements
//! - Trades reaching the registry
//! - Unsubscribe on shutdown

mod integration;
use integration::common::mock_ws::{MockWsServer, MOCK_TRADE_PRICE};

use coinwatch_app::config::{DisplayConfig, WsConfig};
use coinwatch_app::{AppConfig, AppError, Application};
use coinwatch_ws::ConnectionState;
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

fn config(url: String) -> AppConfig {
    AppConfig {
        ws_url: url,
        symbols: vec!["btcusdt".to_string(), "ethusdt".to_string()],
        moving_average_window: 2,
        websocket: WsConfig {
            connect_timeout_secs: 5,
            handshake_timeout_ms: 2_000,
            ..Default::default()
        },
        display: DisplayConfig {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Poll `check` every 50ms for up to 3s.
async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    timeout(Duration::from_secs(3), async {
        loop {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .is_ok()
}

#[tokio::test]
async fn test_start_subscribes_and_trades_reach_registry() {
    coinwatch_ws::init_crypto();
    let server = MockWsServer::start().await;
    let app = Application::new(config(server.url())).unwrap();

    app.start().await.unwrap();
    assert!(app.connection().is_connected());
    assert_eq!(server.connection_count().await, 1);

    let registry = app.registry().clone();
    let updated = wait_until(|| {
        let registry = registry.clone();
        async move {
            ["btcusdt", "ethusdt"].iter().all(|s| {
                registry
                    .get_coin(s)
                    .is_some_and(|c| c.last_trade_at().is_some())
            })
        }
    })
    .await;
    assert!(updated, "both coins should receive a trade");

    let expected: f64 = MOCK_TRADE_PRICE.parse().unwrap();
    let btc = registry.get_coin("btcusdt").unwrap();
    assert_eq!(btc.price(), expected);
    assert_eq!(btc.moving_average().len(), 1);

    let envelopes = server.received_envelopes().await;
    assert_eq!(envelopes[0]["method"], json!("SUBSCRIBE"));
    assert_eq!(envelopes[0]["params"], json!(["btcusdt@trade", "ethusdt@trade"]));
    assert_eq!(envelopes[0]["id"], json!(1));

    let router = app.router().clone();
    assert!(wait_until(|| {
        let router = router.clone();
        async move { router.stats().acks() >= 1 }
    })
    .await);
    assert_eq!(router.stats().trades(), 2);
    assert_eq!(router.stats().unknown_symbol(), 0);

    app.shutdown().unwrap();
    assert_eq!(app.connection().state(), ConnectionState::Disconnected);
    assert!(app.registry().is_empty());

    let server_ref = &server;
    let unsubscribed = wait_until(|| async move {
        server_ref
            .received_envelopes()
            .await
            .iter()
            .any(|e| e["method"] == json!("UNSUBSCRIBE"))
    })
    .await;
    assert!(unsubscribed, "shutdown should unsubscribe tracked streams");

    server.shutdown().await;
}

#[tokio::test]
async fn test_ticker_streams_subscribed_after_trades() {
    let server = MockWsServer::start().await;
    let mut config = config(server.url());
    config.ticker_symbols = vec!["btcusdt".to_string()];
    let app = Application::new(config).unwrap();

    app.start().await.unwrap();

    let server_ref = &server;
    let received =
        wait_until(|| async move { server_ref.received_envelopes().await.len() >= 2 }).await;
    assert!(received);

    let envelopes = server.received_envelopes().await;
    assert_eq!(envelopes[1]["method"], json!("SUBSCRIBE"));
    assert_eq!(envelopes[1]["params"], json!(["btcusdt@ticker"]));
    assert_eq!(envelopes[1]["id"], json!(2));
    assert_eq!(app.connection().active_streams().len(), 3);

    app.shutdown().unwrap();
    server.shutdown().await;
}

#[tokio::test]
async fn test_run_stops_after_run_for_secs() {
    let server = MockWsServer::start().await;
    let mut config = config(server.url());
    config.run_for_secs = Some(1);
    let app = Application::new(config).unwrap();

    let result = timeout(Duration::from_secs(5), app.run()).await;
    assert!(matches!(result, Ok(Ok(()))), "run should finish on its own");

    server.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_server_times_out() {
    // Bind then drop to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut config = config(format!("ws://127.0.0.1:{port}"));
    config.websocket.connect_timeout_secs = 1;
    let app = Application::new(config).unwrap();

    let result = app.start().await;

    assert!(matches!(result, Err(AppError::ConnectTimeout(1))));
    assert_eq!(app.connection().state(), ConnectionState::Disconnected);
    assert!(app.registry().is_empty());
}
