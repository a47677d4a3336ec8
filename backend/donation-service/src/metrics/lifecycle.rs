//! Prometheus metrics for lifecycle operations
//!
//! One counter labelled by operation and outcome, plus a histogram of how many
//! sibling requests each allotment auto-declines.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, Histogram, IntCounterVec,
};

use crate::error::AppError;

/// Lifecycle operations by outcome (ok, not_found, forbidden, conflict, ...)
static OPERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "donation_lifecycle_operations_total",
        "Donation lifecycle operations by operation and outcome",
        &["operation", "outcome"]
    )
    .expect("failed to register donation_lifecycle_operations_total")
});

/// Sibling requests declined per confirmed allotment
static SIBLINGS_DECLINED: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "donation_allotment_siblings_declined",
        "Pending sibling requests auto-declined when a request is confirmed",
        vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0]
    )
    .expect("failed to register donation_allotment_siblings_declined")
});

/// Record the outcome of one lifecycle operation
pub fn record_operation<T>(operation: &str, result: &Result<T, AppError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(err) => err.kind(),
    };
    OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn record_siblings_declined(count: usize) {
    SIBLINGS_DECLINED.observe(count as f64);
}
