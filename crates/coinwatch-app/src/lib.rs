//! coinwatch: live Binance trade-stream tracker.
//!
//! Orchestrates all components:
//! - Websocket connection and subscriptions
//! - Trade routing into the coin registry
//! - Console table of prices and moving averages
//! - Metrics and structured logging

pub mod app;
pub mod config;
pub mod display;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
