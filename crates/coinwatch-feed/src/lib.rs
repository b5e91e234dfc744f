//! Trade stream ingestion for coinwatch.
//!
//! Routes inbound websocket frames into a `CoinRegistry` of per-symbol
//! trade state and rebroadcasts 24h ticker events.

pub mod decode;
pub mod error;
pub mod registry;
pub mod router;

pub use decode::{decode_ticker, decode_trade, TICKER_FIELDS, TRADE_FIELDS};
pub use error::{FeedError, FeedResult};
pub use registry::CoinRegistry;
pub use router::{MessageRouter, RouteOutcome, RouterStats, TICKER_CHANNEL_CAPACITY};
