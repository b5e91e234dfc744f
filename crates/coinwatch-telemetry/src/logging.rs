//! Structured logging initialization.
//!
//! Two sinks, both optional:
//! - console on stderr (JSON when `RUST_ENV=production`, pretty otherwise)
//! - one daily-rolled file per severity: `<dir>/<severity>.YYYY-MM-DD.log`

use crate::error::{TelemetryError, TelemetryResult};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::filter_fn, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,coinwatch=debug";

/// Severities with their own log file. TRACE events go to the debug file.
pub const FILE_LEVELS: [Level; 4] = [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG];

/// Where log output goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Directory for per-severity files. No files when unset.
    pub dir: Option<PathBuf>,
    /// Also log to stderr.
    pub console: bool,
}

/// Keeps the file writers flushing. Hold it until the process exits.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _workers: Vec<WorkerGuard>,
}

/// File name prefix for a severity, e.g. `warn`.
pub fn file_prefix(level: Level) -> String {
    level.as_str().to_ascii_lowercase()
}

/// Daily-rolled appender for one severity under `dir`.
pub fn severity_appender(dir: &Path, level: Level) -> TelemetryResult<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_prefix(level))
        .filename_suffix("log")
        .build(dir)
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

fn file_layers(
    dir: &Path,
) -> TelemetryResult<(Vec<Box<dyn Layer<Registry> + Send + Sync>>, Vec<WorkerGuard>)> {
    let mut layers = Vec::with_capacity(FILE_LEVELS.len());
    let mut guards = Vec::with_capacity(FILE_LEVELS.len());

    for level in FILE_LEVELS {
        let (writer, guard) = tracing_appender::non_blocking(severity_appender(dir, level)?);
        guards.push(guard);

        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .compact()
            .with_filter(filter_fn(move |meta| {
                let event_level = *meta.level();
                event_level == level || (level == Level::DEBUG && event_level == Level::TRACE)
            }))
            .boxed();
        layers.push(layer);
    }
    Ok((layers, guards))
}

/// Initialize structured logging.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(options: &LogOptions) -> TelemetryResult<LogGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let is_production = std::env::var("RUST_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    let (files, workers) = match &options.dir {
        Some(dir) => file_layers(dir)?,
        None => (Vec::new(), Vec::new()),
    };

    let console = options.console.then(|| {
        if is_production {
            fmt::layer()
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .boxed()
        } else {
            fmt::layer()
                .with_writer(std::io::stderr)
                .pretty()
                .with_target(true)
                .with_thread_names(true)
                .boxed()
        }
    });

    tracing_subscriber::registry()
        .with(files)
        .with(env_filter)
        .with(console)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    Ok(LogGuard { _workers: workers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("coinwatch-{name}-{}", std::process::id()))
    }

    #[test]
    fn test_second_init_fails() {
        let options = LogOptions::default();
        let _guard = init_logging(&options);
        assert!(matches!(
            init_logging(&options),
            Err(TelemetryError::LoggingInit(_))
        ));
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn test_file_prefixes() {
        let prefixes: Vec<String> = FILE_LEVELS.iter().map(|l| file_prefix(*l)).collect();
        assert_eq!(prefixes, vec!["error", "warn", "info", "debug"]);
    }

    #[test]
    fn test_severity_appender_writes_dated_file() {
        let dir = temp_dir("logs");
        let _ = std::fs::remove_dir_all(&dir);

        let mut appender = severity_appender(&dir, Level::WARN).unwrap();
        appender.write_all(b"warning line\n").unwrap();
        appender.flush().unwrap();

        let names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("warn."));
        assert!(names[0].ends_with(".log"));
    }

    #[test]
    fn test_severity_appender_rejects_file_as_dir() {
        let path = temp_dir("not-a-dir");
        std::fs::write(&path, "x").unwrap();

        let result = severity_appender(&path, Level::INFO);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(TelemetryError::Io(_))));
    }
}
