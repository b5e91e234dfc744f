//! Diagnostics channel for the ingestion pipeline.
//!
//! Every discard or skip path reports here instead of returning an error.
//! Implementations must never block or panic; they are called from the
//! network callback task.

use parking_lot::Mutex;
use std::fmt;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Lowercase label, used for metric labels and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known diagnostic categories.
pub mod category {
    pub const CONNECTION: &str = "connection";
    pub const SUBSCRIPTION: &str = "subscription";
    pub const ROUTER: &str = "router";
    pub const REGISTRY: &str = "registry";
}

/// Sink for `(severity, category, message)` records.
pub trait Diagnostics: Send + Sync {
    fn record(&self, severity: Severity, category: &str, message: &str);
}

/// A captured diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub severity: Severity,
    pub category: String,
    pub message: String,
}

/// In-memory sink that keeps every record. Intended for tests.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records so far, oldest first.
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Records in one category.
    pub fn in_category(&self, category: &str) -> Vec<DiagnosticRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.category == category)
            .cloned()
            .collect()
    }

    /// Whether any record's message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.records.lock().iter().any(|r| r.message.contains(needle))
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn record(&self, severity: Severity, category: &str, message: &str) {
        self.records.lock().push(DiagnosticRecord {
            severity,
            category: category.to_string(),
            message: message.to_string(),
        });
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn record(&self, _severity: Severity, _category: &str, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_diagnostics_keeps_order() {
        let diags = RecordingDiagnostics::new();
        diags.record(Severity::Warning, category::REGISTRY, "first");
        diags.record(Severity::Error, category::ROUTER, "second");

        let records = diags.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "first");
        assert_eq!(records[1].severity, Severity::Error);
        assert_eq!(diags.in_category(category::ROUTER).len(), 1);
        assert!(diags.contains("sec"));

        diags.clear();
        assert!(diags.is_empty());
    }

    #[test]
    fn test_severity_ordering_and_labels() {
        assert!(Severity::Debug < Severity::Error);
        assert_eq!(Severity::Warning.to_string(), "warning");
    }
}
