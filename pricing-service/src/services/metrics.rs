//! Prometheus metrics for pricing-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Totals calculations by entry point and outcome.
pub static CALCULATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pricing_calculations_total",
        "Total number of pricing calculations",
        &["operation", "outcome"] // calculate|preview, ok|error|tax_pending
    )
    .expect("Failed to register calculations_total")
});

/// Tax provider round-trip duration.
pub static TAX_PROVIDER_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "pricing_tax_provider_duration_seconds",
        "Tax provider request duration in seconds",
        &["outcome"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register tax_provider_duration")
});

/// Snapshot rebuilds by outcome.
pub static REBUILDS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pricing_snapshot_rebuilds_total",
        "Total number of snapshot rebuilds by outcome",
        &["outcome"] // updated, skipped, failed
    )
    .expect("Failed to register snapshot_rebuilds_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pricing_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "pricing_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&CALCULATIONS_TOTAL);
    Lazy::force(&TAX_PROVIDER_DURATION);
    Lazy::force(&REBUILDS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

pub fn record_calculation(operation: &str, outcome: &str) {
    CALCULATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

pub fn record_rebuild(outcome: &str) {
    REBUILDS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
