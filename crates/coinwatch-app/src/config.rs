//! Application configuration.

use crate::error::{AppError, AppResult};
use coinwatch_telemetry::LogOptions;
use coinwatch_ws::TransportConfig;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Env var holding the config path when `--config` is not given.
pub const CONFIG_ENV: &str = "COINWATCH_CONFIG";

/// Config path used when neither `--config` nor `COINWATCH_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Websocket settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsConfig {
    /// How long startup waits for the connection to open.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Upper bound on the websocket handshake.
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    /// Interval between client pings.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    /// Outbound frame queue capacity.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

fn default_connect_timeout_secs() -> u64 {
    15
}

fn default_handshake_timeout_ms() -> u64 {
    10_000
}

fn default_ping_interval_secs() -> u64 {
    20
}

fn default_outbound_buffer() -> usize {
    100
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            ping_interval_secs: default_ping_interval_secs(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

/// Console table settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_display_enabled")]
    pub enabled: bool,
    /// Redraw interval.
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
}

fn default_display_enabled() -> bool {
    true
}

fn default_refresh_ms() -> u64 {
    1_000
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: default_display_enabled(),
            refresh_ms: default_refresh_ms(),
        }
    }
}

/// Log sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily per-severity log files; empty disables them.
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Log to stderr even while the table is drawn.
    #[serde(default)]
    pub console: bool,
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            console: false,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Stream endpoint.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Symbols whose trade streams are tracked (lowercase, e.g. "btcusdt").
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    /// Symbols whose 24h ticker streams are logged.
    #[serde(default)]
    pub ticker_symbols: Vec<String>,
    /// Trades per moving-average window.
    #[serde(default = "default_moving_average_window")]
    pub moving_average_window: usize,
    /// Stop after this many seconds; run until Ctrl-C when unset.
    #[serde(default)]
    pub run_for_secs: Option<u64>,
    #[serde(default)]
    pub websocket: WsConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_ws_url() -> String {
    "wss://stream.binance.com:9443/ws".to_string()
}

fn default_symbols() -> Vec<String> {
    vec![
        "btcusdt".to_string(),
        "ethusdt".to_string(),
        "solusdt".to_string(),
    ]
}

fn default_moving_average_window() -> usize {
    20
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            symbols: default_symbols(),
            ticker_symbols: Vec::new(),
            moving_average_window: default_moving_average_window(),
            run_for_secs: None,
            websocket: WsConfig::default(),
            display: DisplayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Pick the config path: CLI arg > `COINWATCH_CONFIG` > default.
    pub fn resolve_path(cli_path: Option<String>) -> String {
        cli_path
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            warn!(path = %path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        self.window_size()?;
        if self.ws_url.is_empty() {
            return Err(AppError::Config("ws_url must not be empty".to_string()));
        }
        if self.display.refresh_ms == 0 {
            return Err(AppError::Config("display.refresh_ms must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn window_size(&self) -> AppResult<NonZeroUsize> {
        Ok(coinwatch_core::window_size(self.moving_average_window)?)
    }

    /// Log sinks. The stderr console is off while the table is drawn,
    /// unless forced or there is no file sink to fall back on.
    pub fn log_options(&self) -> LogOptions {
        let dir = (!self.logging.dir.is_empty()).then(|| PathBuf::from(&self.logging.dir));
        let console = self.logging.console || !self.display.enabled || dir.is_none();
        LogOptions { dir, console }
    }

    /// Transport settings for the configured endpoint.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            url: self.ws_url.clone(),
            handshake_timeout_ms: self.websocket.handshake_timeout_ms,
            ping_interval_secs: self.websocket.ping_interval_secs,
            outbound_buffer: self.websocket.outbound_buffer,
        }
    }
}
