//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] coinwatch_core::CoreError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] coinwatch_ws::WsError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] coinwatch_telemetry::TelemetryError),

    #[error("Not connected after {0}s")]
    ConnectTimeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
