//! Inbound frame router.
//!
//! Classification, first match wins:
//! 1. not JSON -> malformed
//! 2. object with `result` and `id` -> subscription acknowledgement
//! 3. `e == "trade"` -> registry update; `e == "24hrTicker"` -> ticker broadcast
//! 4. anything else -> ignored
//!
//! The router never fails; every discard is reported through `Diagnostics`
//! and counted in `RouterStats`.

use crate::decode::{decode_ticker, decode_trade};
use crate::error::FeedError;
use crate::registry::CoinRegistry;
use coinwatch_core::{category, Diagnostics, Severity, TickerUpdate};
use coinwatch_ws::MessageHandler;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the ticker broadcast channel. Slow receivers lag.
pub const TICKER_CHANNEL_CAPACITY: usize = 256;

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// Not valid JSON.
    Malformed,
    /// Subscription acknowledgement.
    Ack { id: Option<u64>, success: bool },
    /// Trade applied to a tracked coin.
    Trade { symbol: String },
    /// Well-formed trade for a symbol the registry does not track.
    UnknownSymbol { symbol: String },
    /// Ticker decoded and broadcast.
    Ticker { symbol: String },
    /// Trade or ticker event with missing or invalid fields.
    Rejected { event: &'static str },
    /// Valid JSON that is none of the above.
    Ignored,
}

impl RouteOutcome {
    /// Label for the frames counter.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::Ack { .. } => "ack",
            Self::Trade { .. } => "trade",
            Self::UnknownSymbol { .. } => "unknown_symbol",
            Self::Ticker { .. } => "ticker",
            Self::Rejected { .. } => "rejected",
            Self::Ignored => "ignored",
        }
    }
}

/// Per-kind frame counters.
#[derive(Debug, Default)]
pub struct RouterStats {
    malformed: AtomicU64,
    acks: AtomicU64,
    ack_failures: AtomicU64,
    trades: AtomicU64,
    unknown_symbol: AtomicU64,
    tickers: AtomicU64,
    rejected: AtomicU64,
    ignored: AtomicU64,
}

impl RouterStats {
    fn record(&self, outcome: &RouteOutcome) {
        let counter = match outcome {
            RouteOutcome::Malformed => &self.malformed,
            RouteOutcome::Ack { success, .. } => {
                if !success {
                    self.ack_failures.fetch_add(1, Ordering::Relaxed);
                }
                &self.acks
            }
            RouteOutcome::Trade { .. } => &self.trades,
            RouteOutcome::UnknownSymbol { .. } => &self.unknown_symbol,
            RouteOutcome::Ticker { .. } => &self.tickers,
            RouteOutcome::Rejected { .. } => &self.rejected,
            RouteOutcome::Ignored => &self.ignored,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    pub fn acks(&self) -> u64 {
        self.acks.load(Ordering::Relaxed)
    }

    pub fn ack_failures(&self) -> u64 {
        self.ack_failures.load(Ordering::Relaxed)
    }

    pub fn trades(&self) -> u64 {
        self.trades.load(Ordering::Relaxed)
    }

    pub fn unknown_symbol(&self) -> u64 {
        self.unknown_symbol.load(Ordering::Relaxed)
    }

    pub fn tickers(&self) -> u64 {
        self.tickers.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    /// `(kind, count)` pairs using `RouteOutcome::kind` labels.
    pub fn snapshot(&self) -> [(&'static str, u64); 7] {
        [
            ("malformed", self.malformed()),
            ("ack", self.acks()),
            ("trade", self.trades()),
            ("unknown_symbol", self.unknown_symbol()),
            ("ticker", self.tickers()),
            ("rejected", self.rejected()),
            ("ignored", self.ignored()),
        ]
    }

    pub fn total(&self) -> u64 {
        self.snapshot().iter().map(|(_, n)| n).sum()
    }
}

/// Routes inbound frames to the registry and ticker subscribers.
pub struct MessageRouter {
    registry: Arc<CoinRegistry>,
    diagnostics: Arc<dyn Diagnostics>,
    stats: RouterStats,
    ticker_tx: broadcast::Sender<TickerUpdate>,
}

impl MessageRouter {
    pub fn new(registry: Arc<CoinRegistry>, diagnostics: Arc<dyn Diagnostics>) -> Self {
        let (ticker_tx, _) = broadcast::channel(TICKER_CHANNEL_CAPACITY);
        Self {
            registry,
            diagnostics,
            stats: RouterStats::default(),
            ticker_tx,
        }
    }

    /// Receive every ticker decoded from now on.
    pub fn subscribe_tickers(&self) -> broadcast::Receiver<TickerUpdate> {
        self.ticker_tx.subscribe()
    }

    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    fn diag(&self, severity: Severity, message: &str) {
        self.diagnostics.record(severity, category::ROUTER, message);
    }

    /// Classify and dispatch one frame.
    pub fn route(&self, frame: &str) -> RouteOutcome {
        let outcome = self.dispatch(frame);
        trace!(kind = outcome.kind(), "Frame routed");
        self.stats.record(&outcome);
        outcome
    }

    fn dispatch(&self, frame: &str) -> RouteOutcome {
        let value: Value = match serde_json::from_str(frame) {
            Ok(value) => value,
            Err(e) => {
                self.diag(Severity::Warning, &format!("malformed frame: {e}"));
                return RouteOutcome::Malformed;
            }
        };

        let Some(obj) = value.as_object() else {
            return RouteOutcome::Ignored;
        };

        if obj.contains_key("result") && obj.contains_key("id") {
            return self.handle_ack(obj);
        }

        match obj.get("e").and_then(Value::as_str) {
            Some("trade") => self.handle_trade(&value),
            Some("24hrTicker") => self.handle_ticker(&value),
            _ => RouteOutcome::Ignored,
        }
    }

    fn handle_ack(&self, obj: &Map<String, Value>) -> RouteOutcome {
        let id = obj.get("id").and_then(Value::as_u64);
        let result = &obj["result"];
        let success = result.is_null();

        if success {
            self.diagnostics.record(
                Severity::Info,
                category::SUBSCRIPTION,
                &format!("request {id:?} acknowledged"),
            );
        } else {
            self.diagnostics.record(
                Severity::Warning,
                category::SUBSCRIPTION,
                &format!("request {id:?} failed: {result}"),
            );
        }
        RouteOutcome::Ack { id, success }
    }

    fn handle_trade(&self, value: &Value) -> RouteOutcome {
        let trade = match decode_trade(value) {
            Ok(trade) => trade,
            Err(e) => return self.reject("trade", e),
        };

        if self.registry.update_coin_data(&trade) {
            RouteOutcome::Trade {
                symbol: trade.symbol,
            }
        } else {
            RouteOutcome::UnknownSymbol {
                symbol: trade.symbol,
            }
        }
    }

    fn handle_ticker(&self, value: &Value) -> RouteOutcome {
        let ticker = match decode_ticker(value) {
            Ok(ticker) => ticker,
            Err(e) => return self.reject("ticker", e),
        };

        let symbol = ticker.symbol.clone();
        // No receivers is fine.
        let _ = self.ticker_tx.send(ticker);
        RouteOutcome::Ticker { symbol }
    }

    fn reject(&self, event: &'static str, error: FeedError) -> RouteOutcome {
        let message = match &error {
            FeedError::MissingFields(fields) => {
                format!("{event} discarded, missing required fields {fields:?}")
            }
            other => format!("{event} discarded: {other}"),
        };
        self.diag(Severity::Warning, &message);
        RouteOutcome::Rejected { event }
    }
}

impl MessageHandler for MessageRouter {
    fn handle_frame(&self, frame: &str) {
        self.route(frame);
    }
}
