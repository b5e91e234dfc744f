//! Core domain types for the coinwatch market tracker.
//!
//! - `Coin`: per-symbol latest-trade state
//! - `MovingAverage`: fixed-window trailing mean over trade prices
//! - `TradeUpdate`, `TickerUpdate`: decoded market events
//! - `Diagnostics`: injected sink for discard/skip reports

pub mod coin;
pub mod diagnostics;
pub mod error;
pub mod indicator;
pub mod types;

pub use coin::Coin;
pub use diagnostics::{
    category, DiagnosticRecord, Diagnostics, NullDiagnostics, RecordingDiagnostics, Severity,
};
pub use error::{CoreError, Result};
pub use indicator::{window_size, MovingAverage};
pub use types::{
    ticker_stream, trade_stream, validate_symbol, TickerUpdate, TradeUpdate,
    TICKER_STREAM_SUFFIX, TRADE_STREAM_SUFFIX,
};
