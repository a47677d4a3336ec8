//! Prometheus metrics for the donation expiry sweep
//!
//! Tracks sweep cycles, expired donation counts, and sweep duration

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::time::Duration;

/// Total number of sweep cycles run (success/error)
static SWEEP_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "donation_expiry_sweep_runs_total",
        "Total number of donation expiry sweep cycles (success/error)",
        &["status"]
    )
    .expect("failed to register donation_expiry_sweep_runs_total")
});

/// Donations moved from pending to expired
static DONATIONS_EXPIRED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "donation_expiry_donations_expired_total",
        "Total pending donations moved to expired"
    )
    .expect("failed to register donation_expiry_donations_expired_total")
});

static SWEEP_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "donation_expiry_sweep_duration_seconds",
        "Duration of donation expiry sweeps",
        vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0]
    )
    .expect("failed to register donation_expiry_sweep_duration_seconds")
});

/// Record a sweep cycle completion
pub fn record_sweep_run(status: &str) {
    SWEEP_RUNS_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_donations_expired(count: u64) {
    DONATIONS_EXPIRED_TOTAL.inc_by(count);
}

pub fn record_sweep_duration(duration: Duration) {
    SWEEP_DURATION_SECONDS.observe(duration.as_secs_f64());
}
