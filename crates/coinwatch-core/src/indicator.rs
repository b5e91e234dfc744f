//! Trailing price indicators.

use crate::error::{CoreError, Result};
use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// Upper bound on samples reserved up front; larger windows grow on demand.
const MAX_PREALLOCATED: usize = 1024;

/// Validate a configured window length.
pub fn window_size(len: usize) -> Result<NonZeroUsize> {
    NonZeroUsize::new(len)
        .ok_or_else(|| CoreError::InvalidConfig("moving average window must be > 0".to_string()))
}

/// Simple moving average over a fixed FIFO window of prices.
///
/// Keeps a running sum so `update` and `value` are O(1). The sum always
/// equals the sum of the retained prices once an update returns.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverage {
    window_size: NonZeroUsize,
    window: VecDeque<f64>,
    running_sum: f64,
}

impl MovingAverage {
    /// Create an empty moving average.
    pub fn new(window_size: NonZeroUsize) -> Self {
        Self {
            window_size,
            window: VecDeque::with_capacity(window_size.get().min(MAX_PREALLOCATED) + 1),
            running_sum: 0.0,
        }
    }

    /// Push a price, evicting the oldest one once the window is full.
    pub fn update(&mut self, price: f64) {
        self.window.push_back(price);
        self.running_sum += price;

        if self.window.len() > self.window_size.get() {
            if let Some(oldest) = self.window.pop_front() {
                self.running_sum -= oldest;
            }
        }
    }

    /// Current mean of the window, or `0.0` when no price has been seen.
    pub fn value(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.running_sum / self.window.len() as f64
    }

    /// Whether the window holds a full `window_size` samples.
    pub fn is_ready(&self) -> bool {
        self.window.len() >= self.window_size.get()
    }

    /// Strictly above the current average.
    pub fn is_price_above(&self, price: f64) -> bool {
        price > self.value()
    }

    /// Strictly below the current average.
    pub fn is_price_below(&self, price: f64) -> bool {
        price < self.value()
    }

    pub fn window_size(&self) -> usize {
        self.window_size.get()
    }

    /// Number of prices currently retained.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Retained prices, oldest first.
    pub fn window(&self) -> impl Iterator<Item = f64> + '_ {
        self.window.iter().copied()
    }
}
