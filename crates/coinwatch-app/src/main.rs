//! coinwatch - Entry Point
//!
//! Streams trades for the configured symbols and shows latest price and
//! moving average per symbol.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{info, warn};

/// Live trade-stream price tracker
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via COINWATCH_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Symbols to track, comma separated (overrides config)
    #[arg(short, long, value_delimiter = ',')]
    symbols: Option<Vec<String>>,

    /// Stop after this many seconds (overrides config)
    #[arg(long)]
    run_for_secs: Option<u64>,

    /// Disable the console table
    #[arg(long)]
    no_display: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any TLS connection
    coinwatch_ws::init_crypto();

    let args = Args::parse();

    // Config comes first: it decides where logs go
    let config_path = coinwatch_app::AppConfig::resolve_path(args.config);
    let mut config = coinwatch_app::AppConfig::load(&config_path)?;
    if let Some(symbols) = args.symbols {
        config.symbols = symbols;
    }
    if args.run_for_secs.is_some() {
        config.run_for_secs = args.run_for_secs;
    }
    if args.no_display {
        config.display.enabled = false;
    }

    let _log_guard = coinwatch_telemetry::init_logging(&config.log_options())?;

    info!("Starting coinwatch v{}", env!("CARGO_PKG_VERSION"));
    if !Path::new(&config_path).exists() {
        warn!(config_path = %config_path, "Config file not found, using defaults");
    }
    info!(
        ws_url = %config.ws_url,
        symbols = ?config.symbols,
        window = config.moving_average_window,
        log_dir = %config.logging.dir,
        config_path = %config_path,
        "Configuration loaded"
    );

    let app = coinwatch_app::Application::new(config)?;
    app.run().await?;

    Ok(())
}
