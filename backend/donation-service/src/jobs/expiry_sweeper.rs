//! Donation Expiry Sweeper Background Job
//!
//! Moves pending donations past their `expires_at` to `expired` and declines
//! the requests still waiting on them. Allotted donations are never touched:
//! once a receiver is confirmed the handover is between donor and receiver.

use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::metrics::expiry_sweeper as metrics;
use crate::services::LifecycleEngine;

pub async fn start_expiry_sweeper(engine: LifecycleEngine, interval: Duration) {
    tracing::info!(
        "Starting donation expiry sweeper (interval={}s)",
        interval.as_secs()
    );

    loop {
        sleep(interval).await;
        run_sweep(&engine).await;
    }
}

/// One sweep cycle; failures are logged and retried on the next tick
pub async fn run_sweep(engine: &LifecycleEngine) {
    let cycle_start = Instant::now();

    match engine.expire_stale_donations(Utc::now()).await {
        Ok(sweep) => {
            metrics::record_sweep_run("success");
            metrics::record_donations_expired(sweep.donations_expired as u64);
            metrics::record_sweep_duration(cycle_start.elapsed());
            if sweep.donations_expired > 0 {
                tracing::info!(
                    donations_expired = sweep.donations_expired,
                    requests_declined = sweep.requests_declined,
                    duration_ms = cycle_start.elapsed().as_millis(),
                    "Expiry sweep completed"
                );
            } else {
                tracing::debug!("Expiry sweep found nothing to expire");
            }
        }
        Err(e) => {
            metrics::record_sweep_run("error");
            metrics::record_sweep_duration(cycle_start.elapsed());
            tracing::error!(error = %e, duration_ms = cycle_start.elapsed().as_millis(), "Expiry sweep failed");
        }
    }
}
