//! Prometheus metrics and structured logging for coinwatch.
//!
//! - Prometheus metrics for connection state, routed frames, diagnostics
//! - Structured logging with tracing: stderr console and daily per-severity files
//! - `TracingDiagnostics`, the production `Diagnostics` sink

pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod metrics;

pub use diagnostics::TracingDiagnostics;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LogGuard, LogOptions};
pub use metrics::Metrics;
