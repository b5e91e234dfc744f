//! Main application orchestration.
//!
//! Wires transport, connection, router and registry together, waits for the
//! session to open, subscribes the configured symbols, then redraws the
//! console table until Ctrl-C or the configured run time elapses.

use crate::config::AppConfig;
use crate::display::{render_table, CLEAR_SCREEN};
use crate::error::{AppError, AppResult};
use coinwatch_core::{ticker_stream, Diagnostics, TickerUpdate};
use coinwatch_feed::{CoinRegistry, MessageRouter};
use coinwatch_telemetry::{Metrics, TracingDiagnostics};
use coinwatch_ws::{Connection, Method, Transport, TungsteniteTransport};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Interval between `is_connected()` checks while waiting for the session.
const CONNECT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Main application.
pub struct Application {
    config: AppConfig,
    registry: Arc<CoinRegistry>,
    router: Arc<MessageRouter>,
    connection: Arc<Connection>,
}

impl Application {
    /// Build the production pipeline: tokio-tungstenite transport and
    /// tracing diagnostics.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let transport = Arc::new(TungsteniteTransport::new(config.transport_config())?);
        Self::with_parts(config, transport, Arc::new(TracingDiagnostics::new()))
    }

    /// Build the pipeline over any transport and diagnostics sink.
    pub fn with_parts(
        config: AppConfig,
        transport: Arc<dyn Transport>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> AppResult<Self> {
        config.validate()?;

        let registry = Arc::new(CoinRegistry::new(
            config.window_size()?,
            diagnostics.clone(),
        ));
        let router = Arc::new(MessageRouter::new(registry.clone(), diagnostics.clone()));
        let connection = Arc::new(Connection::new(transport, diagnostics));

        connection.set_message_handler(router.clone());
        registry.set_connection(&connection);

        Ok(Self {
            config,
            registry,
            router,
            connection,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CoinRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Connect, wait for the session, then subscribe configured streams.
    pub async fn start(&self) -> AppResult<()> {
        info!(url = %self.config.ws_url, "Starting connection");
        self.connection.connect();
        self.wait_for_connection().await?;

        let added = self.registry.add_coins(&self.config.symbols);
        info!(symbols = ?added, "Tracking coins");

        if !self.config.ticker_symbols.is_empty() {
            let streams: Vec<String> = self
                .config
                .ticker_symbols
                .iter()
                .map(|s| ticker_stream(s))
                .collect();
            self.connection.subscribe_to_streams(&streams);
            info!(streams = ?streams, "Subscribed ticker streams");
        }

        self.update_metrics();
        Ok(())
    }

    /// Poll until connected. On timeout the pending attempt is abandoned.
    pub async fn wait_for_connection(&self) -> AppResult<()> {
        let timeout_secs = self.config.websocket.connect_timeout_secs;
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);

        loop {
            if self.connection.is_connected() {
                info!("Connected");
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!(timeout_secs, state = %self.connection.state(), "Connection timed out");
                self.connection.disconnect();
                return Err(AppError::ConnectTimeout(timeout_secs));
            }
            tokio::time::sleep(CONNECT_POLL_INTERVAL).await;
        }
    }

    /// Run until Ctrl-C or `run_for_secs`, then shut down. The table is
    /// drawn on stdout.
    pub async fn run(self) -> AppResult<()> {
        self.run_with_output(std::io::stdout()).await
    }

    /// Like [`run`](Self::run), drawing the table into `out`.
    ///
    /// A failed draw (closed pipe, full disk) ends the loop; shutdown still
    /// runs.
    pub async fn run_with_output<W: Write>(self, mut out: W) -> AppResult<()> {
        self.start().await?;

        let refresh = Duration::from_millis(self.config.display.refresh_ms);
        let mut refresh_interval = tokio::time::interval(refresh);
        let mut tickers = self.router.subscribe_tickers();

        let run_limit = self.config.run_for_secs.map(Duration::from_secs);
        let run_timer = async move {
            match run_limit {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(run_timer);

        info!("Entering main loop");
        loop {
            tokio::select! {
                _ = refresh_interval.tick() => {
                    self.update_metrics();
                    if self.config.display.enabled {
                        if let Err(e) = self.draw(&mut out) {
                            warn!(error = %e, "Console draw failed, stopping");
                            break;
                        }
                    }
                }

                ticker = tickers.recv() => {
                    match ticker {
                        Ok(ticker) => log_ticker(&ticker),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Ticker receiver lagged");
                        }
                        Err(RecvError::Closed) => {
                            warn!("Ticker channel closed");
                            break;
                        }
                    }
                }

                () = &mut run_timer => {
                    info!("Run time elapsed");
                    break;
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown()
    }

    /// Unsubscribe everything, close the session and log final metrics.
    pub fn shutdown(&self) -> AppResult<()> {
        let symbols = self.registry.all_coin_symbols();
        let removed = self.registry.remove_coins(&symbols);
        info!(removed = ?removed, "Coins removed");

        if !self.config.ticker_symbols.is_empty() && self.connection.is_connected() {
            let streams: Vec<String> = self
                .config
                .ticker_symbols
                .iter()
                .map(|s| ticker_stream(s))
                .collect();
            self.connection.unsubscribe_from_streams(&streams);
        }

        self.connection.disconnect();
        self.update_metrics();

        let stats = self.router.stats();
        info!(
            frames = stats.total(),
            trades = stats.trades(),
            rejected = stats.rejected(),
            malformed = stats.malformed(),
            "Shutdown complete"
        );
        debug!(metrics = %Metrics::render()?, "Final metrics");
        Ok(())
    }

    /// Mirror pipeline counters into the prometheus registry.
    pub fn update_metrics(&self) {
        Metrics::ws_state_set(self.connection.state().as_str());
        Metrics::coins_tracked(self.registry.len());
        for (kind, total) in self.router.stats().snapshot() {
            Metrics::frames_observed(kind, total);
        }
        for method in [Method::Subscribe, Method::Unsubscribe] {
            Metrics::subscriptions_observed(method.as_str(), self.connection.envelopes_sent(method));
        }
    }

    fn draw<W: Write>(&self, out: &mut W) -> AppResult<()> {
        let table = render_table(&self.registry.all_coins());
        write!(out, "{CLEAR_SCREEN}{table}")?;
        out.flush()?;
        Ok(())
    }
}

fn log_ticker(ticker: &TickerUpdate) {
    info!(
        symbol = %ticker.symbol,
        last = ticker.last_price,
        change = ticker.price_change,
        change_pct = ticker.price_change_percent,
        high = ticker.high,
        low = ticker.low,
        volume = ticker.volume,
        "24h ticker"
    );
}
