use chrono::{DateTime, Utc};
use serde::Serialize;

use super::LifecycleEngine;
use crate::error::Result;
use crate::metrics::lifecycle as metrics;
use crate::models::DONATION_EXPIRED_REASON;

/// Result of one expiry sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirySweep {
    pub donations_expired: usize,
    pub requests_declined: usize,
}

impl LifecycleEngine {
    /// Move every pending donation whose `expires_at` is not after `now` to
    /// expired, declining its pending requests. Allotted donations are left alone.
    pub async fn expire_stale_donations(&self, now: DateTime<Utc>) -> Result<ExpirySweep> {
        let result = self.try_expire_stale_donations(now).await;
        metrics::record_operation("expire_donations", &result);
        result
    }

    async fn try_expire_stale_donations(&self, now: DateTime<Utc>) -> Result<ExpirySweep> {
        let mut tx = self.store.begin().await?;
        let stale = tx.lock_expired_donations(now).await?;
        if stale.is_empty() {
            return Ok(ExpirySweep::default());
        }

        let mut sweep = ExpirySweep::default();
        for mut donation in stale {
            donation.expire(now)?;
            tx.update_donation(&donation).await?;

            let pending = tx.lock_pending_requests(donation.id, None).await?;
            for mut request in pending {
                request.decline(Some(DONATION_EXPIRED_REASON.to_string()), now)?;
                tx.update_request(&request).await?;
                sweep.requests_declined += 1;
            }

            sweep.donations_expired += 1;
            tracing::debug!(donation_id = %donation.id, expires_at = %donation.expires_at, "Donation expired");
        }

        tx.commit().await?;

        tracing::info!(
            donations_expired = sweep.donations_expired,
            requests_declined = sweep.requests_declined,
            "Expiry sweep applied"
        );
        Ok(sweep)
    }
}
