//! Prometheus metrics for coinwatch.
//!
//! - Connection state
//! - Routed frames per kind
//! - Diagnostics per severity and category
//! - Tracked coins and subscription envelopes
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error caught at first use.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_int_gauge, CounterVec,
    Encoder, Gauge, GaugeVec, IntGauge, TextEncoder,
};

/// Websocket connection state (1 = connected, 0 = not connected).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "coinwatch_ws_connected",
        "Websocket connection state (1=connected)"
    )
    .unwrap()
});

/// Connection state machine current state.
/// Labels: state (disconnected/connecting/connected)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "coinwatch_ws_state",
        "Connection state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Inbound frames by routing outcome.
pub static FRAMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "coinwatch_frames_total",
        "Inbound frames by routing outcome",
        &["kind"]
    )
    .unwrap()
});

/// Diagnostics recorded.
pub static DIAGNOSTICS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "coinwatch_diagnostics_total",
        "Diagnostics recorded by severity and category",
        &["severity", "category"]
    )
    .unwrap()
});

/// Coins currently in the registry.
pub static COINS_TRACKED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("coinwatch_coins_tracked", "Coins currently tracked").unwrap()
});

/// Subscription envelopes sent.
pub static SUBSCRIPTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "coinwatch_subscriptions_total",
        "Subscription envelopes sent",
        &["method"]
    )
    .unwrap()
});

const WS_STATES: [&str; 3] = ["disconnected", "connecting", "connected"];

fn raise_to(counters: &CounterVec, label: &str, total: u64) {
    let counter = counters.with_label_values(&[label]);
    let delta = total as f64 - counter.get();
    if delta > 0.0 {
        counter.inc_by(delta);
    }
}

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Set the connection state. Only the active state is 1.
    pub fn ws_state_set(state: &str) {
        for s in WS_STATES {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
        WS_CONNECTED.set(if state == "connected" { 1.0 } else { 0.0 });
    }

    /// Bring the frames counter for `kind` up to `total`.
    ///
    /// The router keeps its own monotonic counts; this mirrors them.
    pub fn frames_observed(kind: &str, total: u64) {
        raise_to(&FRAMES_TOTAL, kind, total);
    }

    pub fn diagnostic_recorded(severity: &str, category: &str) {
        DIAGNOSTICS_TOTAL
            .with_label_values(&[severity, category])
            .inc();
    }

    pub fn coins_tracked(count: usize) {
        COINS_TRACKED.set(count as i64);
    }

    /// Bring the envelope counter for `method` up to `total`.
    pub fn subscriptions_observed(method: &str, total: u64) {
        raise_to(&SUBSCRIPTIONS_TOTAL, method, total);
    }

    /// Encode every registered metric in the text exposition format.
    pub fn render() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_state_one_hot() {
        Metrics::ws_state_set("connecting");
        Metrics::ws_state_set("connected");

        assert_eq!(WS_STATE.with_label_values(&["connected"]).get(), 1.0);
        assert_eq!(WS_STATE.with_label_values(&["connecting"]).get(), 0.0);
        assert_eq!(WS_STATE.with_label_values(&["disconnected"]).get(), 0.0);
        assert_eq!(WS_CONNECTED.get(), 1.0);
    }

    #[test]
    fn test_frames_observed_is_monotonic() {
        Metrics::frames_observed("test_kind", 5);
        Metrics::frames_observed("test_kind", 3);
        assert_eq!(FRAMES_TOTAL.with_label_values(&["test_kind"]).get(), 5.0);

        Metrics::frames_observed("test_kind", 8);
        assert_eq!(FRAMES_TOTAL.with_label_values(&["test_kind"]).get(), 8.0);
    }

    #[test]
    fn test_render_contains_metric_names() {
        Metrics::coins_tracked(3);
        Metrics::subscriptions_observed("SUBSCRIBE", 2);
        Metrics::diagnostic_recorded("warning", "router");

        let text = Metrics::render().unwrap();
        assert!(text.contains("coinwatch_coins_tracked 3"));
        assert!(text.contains("coinwatch_subscriptions_total{method=\"SUBSCRIBE\"} 2"));
        assert!(text.contains("coinwatch_diagnostics_total"));
    }
}
