//! Prometheus metrics for payment-callback-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Callback requests by channel (`return`, `notify`) and outcome.
pub static CALLBACK_REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payment_callback_requests_total",
        "Total number of gateway callbacks by channel and outcome",
        &["channel", "outcome"]
    )
    .expect("Failed to register CALLBACK_REQUESTS")
});

/// Fulfilments that committed, by payment kind.
pub static FULFILLMENTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payment_callback_fulfillments_total",
        "Total number of committed fulfilments by kind",
        &["kind"]
    )
    .expect("Failed to register FULFILLMENTS")
});

pub static ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payment_callback_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register ERRORS")
});

pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "payment_callback_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&CALLBACK_REQUESTS);
    Lazy::force(&FULFILLMENTS);
    Lazy::force(&ERRORS);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_callback(channel: &str, outcome: &str) {
    CALLBACK_REQUESTS
        .with_label_values(&[channel, outcome])
        .inc();
}

pub fn record_fulfillment(kind: &str) {
    FULFILLMENTS.with_label_values(&[kind]).inc();
}

pub fn record_error(error_type: &str) {
    ERRORS.with_label_values(&[error_type]).inc();
}
