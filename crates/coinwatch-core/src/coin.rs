//! Per-symbol market state.

use crate::indicator::MovingAverage;
use crate::types::TradeUpdate;
use chrono::{DateTime, TimeZone, Utc};
use std::num::NonZeroUsize;

/// Latest trade state for one traded symbol.
///
/// Only the registry mutates a `Coin`; everyone else sees cloned snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Coin {
    symbol: String,
    price: f64,
    last_trade_id: i64,
    last_trade_quantity: f64,
    last_trade_time: i64,
    moving_average: MovingAverage,
}

impl Coin {
    /// Create a coin with zeroed trade state and an empty average.
    pub fn new(symbol: impl Into<String>, window_size: NonZeroUsize) -> Self {
        Self {
            symbol: symbol.into(),
            price: 0.0,
            last_trade_id: 0,
            last_trade_quantity: 0.0,
            last_trade_time: 0,
            moving_average: MovingAverage::new(window_size),
        }
    }

    /// Apply a trade. Last write wins: no ordering check against the
    /// previous trade id or time.
    pub fn update_trade(&mut self, trade: &TradeUpdate) {
        self.price = trade.price;
        self.last_trade_id = trade.trade_id;
        self.last_trade_quantity = trade.trade_quantity;
        self.last_trade_time = trade.trade_time;
        self.moving_average.update(trade.price);
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn last_trade_id(&self) -> i64 {
        self.last_trade_id
    }

    pub fn last_trade_quantity(&self) -> f64 {
        self.last_trade_quantity
    }

    /// Trade time in epoch milliseconds (0 before the first trade).
    pub fn last_trade_time(&self) -> i64 {
        self.last_trade_time
    }

    /// Trade time as a UTC timestamp, `None` before the first trade.
    pub fn last_trade_at(&self) -> Option<DateTime<Utc>> {
        if self.last_trade_time == 0 {
            return None;
        }
        Utc.timestamp_millis_opt(self.last_trade_time).single()
    }

    pub fn moving_average(&self) -> &MovingAverage {
        &self.moving_average
    }

    /// Whether any trade has been applied since creation.
    pub fn has_traded(&self) -> bool {
        !self.moving_average.is_empty()
    }
}
