//! `Diagnostics` sink backed by `tracing`.

use crate::metrics::Metrics;
use coinwatch_core::{Diagnostics, Severity};
use tracing::{debug, error, info, warn};

/// Logs each diagnostic at its severity and counts it in
/// `coinwatch_diagnostics_total`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl TracingDiagnostics {
    pub fn new() -> Self {
        Self
    }
}

impl Diagnostics for TracingDiagnostics {
    fn record(&self, severity: Severity, category: &str, message: &str) {
        match severity {
            Severity::Debug => debug!(category, "{message}"),
            Severity::Info => info!(category, "{message}"),
            Severity::Warning => warn!(category, "{message}"),
            Severity::Error => error!(category, "{message}"),
        }
        Metrics::diagnostic_recorded(severity.as_str(), category);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::DIAGNOSTICS_TOTAL;
    use coinwatch_core::category;

    #[test]
    fn test_record_counts_by_severity_and_category() {
        let diags = TracingDiagnostics::new();
        let before = DIAGNOSTICS_TOTAL
            .with_label_values(&["error", category::CONNECTION])
            .get();

        diags.record(Severity::Error, category::CONNECTION, "transport error: boom");
        diags.record(Severity::Error, category::CONNECTION, "transport error: again");

        let after = DIAGNOSTICS_TOTAL
            .with_label_values(&["error", category::CONNECTION])
            .get();
        assert_eq!(after - before, 2.0);
    }
}
