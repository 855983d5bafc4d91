//! Prometheus metrics for the bracket lifecycle.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error caught on first use.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, CounterVec, Encoder, TextEncoder};

use crate::error::{TelemetryError, TelemetryResult};

/// Brackets opened.
/// Labels: direction (long/short)
pub static BRACKET_OPENED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bracket_opened_total",
        "Total brackets opened",
        &["direction"]
    )
    .unwrap()
});

/// Brackets that reached a terminal phase.
/// Labels: outcome (stop_loss/take_profit/exit_canceled/entry_not_filled)
pub static BRACKET_RESOLVED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bracket_resolved_total",
        "Total brackets resolved",
        &["outcome"]
    )
    .unwrap()
});

/// Monitor polls by resulting phase.
pub static BRACKET_POLLS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bracket_polls_total",
        "Total bracket monitor polls",
        &["phase"]
    )
    .unwrap()
});

/// Cancel attempts by result (canceled/already_closed/failed).
pub static BRACKET_CANCEL_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bracket_cancel_total",
        "Total cancel attempts issued by the bracket logic",
        &["result"]
    )
    .unwrap()
});

/// Brackets left with an entry but incomplete exits.
pub static BRACKET_PARTIAL_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bracket_partial_total",
        "Total partially opened brackets",
        &["policy"]
    )
    .unwrap()
});

/// Metric recording facade.
pub struct Metrics;

impl Metrics {
    pub fn bracket_opened(direction: &str) {
        BRACKET_OPENED_TOTAL.with_label_values(&[direction]).inc();
    }

    pub fn bracket_resolved(outcome: &str) {
        BRACKET_RESOLVED_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn bracket_polled(phase: &str) {
        BRACKET_POLLS_TOTAL.with_label_values(&[phase]).inc();
    }

    pub fn cancel_attempt(result: &str) {
        BRACKET_CANCEL_TOTAL.with_label_values(&[result]).inc();
    }

    pub fn partial_bracket(policy: &str) {
        BRACKET_PARTIAL_TOTAL.with_label_values(&[policy]).inc();
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
