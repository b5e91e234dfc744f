//! Decoded market events.
//!
//! Both types are transient: the router builds them from a single inbound
//! frame and hands them off immediately.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Suffix of a per-symbol trade stream name.
pub const TRADE_STREAM_SUFFIX: &str = "@trade";

/// Suffix of a per-symbol 24h ticker stream name.
pub const TICKER_STREAM_SUFFIX: &str = "@ticker";

/// Trade stream name for a symbol (`btcusdt` -> `btcusdt@trade`).
///
/// The symbol is used verbatim; callers pass the casing the exchange expects.
pub fn trade_stream(symbol: &str) -> String {
    format!("{symbol}{TRADE_STREAM_SUFFIX}")
}

/// Ticker stream name for a symbol (`btcusdt` -> `btcusdt@ticker`).
pub fn ticker_stream(symbol: &str) -> String {
    format!("{symbol}{TICKER_STREAM_SUFFIX}")
}

/// Reject symbols that can never name a stream.
pub fn validate_symbol(symbol: &str) -> Result<()> {
    if symbol.is_empty() {
        return Err(CoreError::InvalidSymbol(symbol.to_string()));
    }
    Ok(())
}

/// A single executed trade, as applied to a [`Coin`](crate::Coin).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeUpdate {
    /// Exchange symbol the trade belongs to.
    pub symbol: String,
    /// Execution price.
    pub price: f64,
    /// Exchange trade sequence number.
    pub trade_id: i64,
    /// Executed quantity.
    pub trade_quantity: f64,
    /// Trade time (epoch milliseconds).
    pub trade_time: i64,
}

/// Rolling 24h statistics for one symbol.
///
/// Forwarded to ticker consumers only; never stored in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerUpdate {
    pub symbol: String,
    pub last_price: f64,
    pub price_change: f64,
    pub price_change_percent: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
}
