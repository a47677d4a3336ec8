//! Donation lifecycle engine.
//!
//! `LifecycleEngine` owns every state transition across donations, requests,
//! reviews, reports and user stats. Each operation opens one store transaction,
//! performs all reads and writes through it and commits; an early return drops
//! the transaction and discards its writes.
//!
//! Read-only listings live next to the write path of the record they list.
//! Leaderboard and analytics are in [`aggregation`].

use std::sync::Arc;

use crate::store::LifecycleStore;

pub mod aggregation;
mod donations;
mod expiry;
mod reports;
mod requests;
mod reviews;

pub use aggregation::AggregationService;
pub use expiry::ExpirySweep;
pub use requests::{Allotment, Completion};

/// Radius used by the nearby listing when the caller gives none
pub const DEFAULT_NEARBY_RADIUS_KM: f64 = 20.0;

/// User-facing failure messages, returned verbatim in error bodies
pub(crate) mod messages {
    pub const DONATION_NOT_FOUND: &str = "Donation not found";
    pub const DONATION_UNAVAILABLE: &str = "Donation is no longer available";
    pub const ALREADY_REQUESTED: &str = "You already requested this donation";
    pub const REQUEST_NOT_FOUND: &str = "Request not found";
    pub const NOT_AUTHORIZED: &str = "Not authorized";
    pub const REQUEST_PROCESSED: &str = "Request already processed";
    pub const COMPLETE_REQUIRES_CONFIRMED: &str = "Only confirmed requests can be completed";
    pub const ONLY_RECEIVER_CAN_REVIEW: &str = "Only receiver can review";
    pub const REVIEW_REQUIRES_PICKUP: &str = "Can only review completed donations";
    pub const ALREADY_REVIEWED: &str = "Already reviewed this donation";
    pub const REVIEW_NOT_FOUND: &str = "Review not found";
    pub const INVALID_REPORT_TYPE: &str = "Invalid report type";
    pub const ONLY_RECEIVER_EXPIRED_FOOD: &str = "Only receiver can report expired food";
    pub const ONLY_DONOR_NO_SHOW: &str = "Only donor can report no-show";
    pub const DONATION_NOT_ALLOTTED: &str = "Donation has not been allotted";
    pub const ALREADY_REPORTED: &str = "You already reported this issue";
    pub const REPORT_NOT_FOUND: &str = "Report not found";
    pub const INVALID_REPORT_STATUS: &str = "Invalid report status";
}

#[derive(Clone)]
pub struct LifecycleEngine {
    store: Arc<dyn LifecycleStore>,
    nearby_radius_km: f64,
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn LifecycleStore>) -> Self {
        Self {
            store,
            nearby_radius_km: DEFAULT_NEARBY_RADIUS_KM,
        }
    }

    /// Override the nearby listing's default radius
    pub fn with_nearby_radius(mut self, radius_km: f64) -> Self {
        self.nearby_radius_km = radius_km;
        self
    }

    pub fn store(&self) -> &Arc<dyn LifecycleStore> {
        &self.store
    }
}
