//! Event payload decoding.
//!
//! Trade payload: `{"e":"trade","s":"BTCUSDT","t":12345,"p":"0.001","q":"100","T":1672515782136,"m":true}`
//! Ticker payload: `{"e":"24hrTicker","s":"BTCUSDT","c":"...","p":"...","P":"...","h":"...","l":"...","v":"..."}`
//!
//! Prices and quantities arrive as decimal strings. Extra fields are ignored.
//! The exchange reports `s` upper-cased while stream names and registry keys
//! are lower-case, so decoded symbols are lower-cased.

use crate::error::{FeedError, FeedResult};
use coinwatch_core::{TickerUpdate, TradeUpdate};
use serde::Deserialize;
use serde_json::Value;

/// Fields a trade event must carry.
pub const TRADE_FIELDS: [&str; 6] = ["s", "t", "p", "q", "T", "m"];

/// Fields a ticker event must carry.
pub const TICKER_FIELDS: [&str; 7] = ["s", "c", "p", "P", "h", "l", "v"];

#[derive(Debug, Deserialize)]
struct RawTrade {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "t")]
    trade_id: i64,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    quantity: String,
    #[serde(rename = "T")]
    trade_time: i64,
    // Validated for type only.
    #[serde(rename = "m")]
    _buyer_is_maker: bool,
}

#[derive(Debug, Deserialize)]
struct RawTicker {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "c")]
    last_price: String,
    #[serde(rename = "p")]
    price_change: String,
    #[serde(rename = "P")]
    price_change_percent: String,
    #[serde(rename = "h")]
    high: String,
    #[serde(rename = "l")]
    low: String,
    #[serde(rename = "v")]
    volume: String,
}

fn missing_fields(value: &Value, required: &[&'static str]) -> FeedResult<()> {
    let obj = value
        .as_object()
        .ok_or_else(|| FeedError::ParseError("event is not a JSON object".to_string()))?;
    let missing: Vec<&'static str> = required
        .iter()
        .copied()
        .filter(|field| !obj.contains_key(*field))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(FeedError::MissingFields(missing))
    }
}

fn parse_number(field: &str, raw: &str) -> FeedResult<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FeedError::InvalidData(format!("{field}={raw:?} is not a number")))
}

/// Decode a trade event. Checks presence of every required field first.
pub fn decode_trade(value: &Value) -> FeedResult<TradeUpdate> {
    missing_fields(value, &TRADE_FIELDS)?;
    let raw = RawTrade::deserialize(value)
        .map_err(|e| FeedError::InvalidData(format!("trade: {e}")))?;

    Ok(TradeUpdate {
        price: parse_number("p", &raw.price)?,
        trade_quantity: parse_number("q", &raw.quantity)?,
        symbol: raw.symbol.to_ascii_lowercase(),
        trade_id: raw.trade_id,
        trade_time: raw.trade_time,
    })
}

/// Decode a 24h ticker event.
pub fn decode_ticker(value: &Value) -> FeedResult<TickerUpdate> {
    missing_fields(value, &TICKER_FIELDS)?;
    let raw = RawTicker::deserialize(value)
        .map_err(|e| FeedError::InvalidData(format!("ticker: {e}")))?;

    Ok(TickerUpdate {
        last_price: parse_number("c", &raw.last_price)?,
        price_change: parse_number("p", &raw.price_change)?,
        price_change_percent: parse_number("P", &raw.price_change_percent)?,
        high: parse_number("h", &raw.high)?,
        low: parse_number("l", &raw.low)?,
        volume: parse_number("v", &raw.volume)?,
        symbol: raw.symbol.to_ascii_lowercase(),
    })
}
