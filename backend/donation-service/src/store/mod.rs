//! Persistence abstraction for the donation lifecycle.
//!
//! `LifecycleStore` is the entry point. Reads that don't participate in a state
//! transition go straight to the store; every lifecycle operation opens a
//! `LifecycleTx`, performs all of its reads and writes through it, and commits.
//! Dropping a transaction without committing discards its writes.
//!
//! Two backends are provided: `PgLifecycleStore` (PostgreSQL, row locks plus
//! unique indexes) and `InMemoryStore` (single writer lock, used by tests and
//! local development).

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgLifecycleStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Donation, DonationCounts, DonationStatus, LeaderboardEntry, Report, ReportStatus, Request,
    Review, UserCounts, UserStats,
};

/// Unique constraint names shared by both backends
pub mod constraints {
    pub const REQUEST_DONATION_RECEIVER: &str = "requests_donation_receiver_key";
    pub const REVIEW_DONATION_REVIEWER: &str = "reviews_donation_reviewer_key";
    pub const REPORT_REPORTER_DONATION_TYPE: &str = "reports_reporter_donation_type_key";
    /// Partial index: one confirmed/completed request per donation
    pub const REQUEST_ONE_WINNER: &str = "requests_one_winner_per_donation";
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Duplicate key violates {constraint}")]
    Duplicate { constraint: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_duplicate(&self, constraint: &str) -> bool {
        matches!(self, StoreError::Duplicate { constraint: c } if c == constraint)
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Admin donation listing filters; `None` means unfiltered
#[derive(Debug, Clone, Default)]
pub struct DonationQuery {
    pub status: Option<DonationStatus>,
    pub area: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

/// Great-circle radius query; the store decides how to evaluate it
#[derive(Debug, Clone, Copy)]
pub struct RadiusQuery {
    pub lng: f64,
    pub lat: f64,
    pub radius_km: f64,
}

/// Store entry point: transactions plus read-only queries
#[async_trait]
pub trait LifecycleStore: Send + Sync {
    /// Open a transaction. All lifecycle writes go through it.
    async fn begin<'a>(&'a self) -> StoreResult<Box<dyn LifecycleTx + 'a>>;

    /// Cheap liveness probe for readiness checks
    async fn ping(&self) -> StoreResult<()>;

    async fn get_donation(&self, id: Uuid) -> StoreResult<Option<Donation>>;

    /// Pending, unexpired donations within the radius, nearest first
    async fn list_nearby_donations(
        &self,
        query: RadiusQuery,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Donation>>;

    async fn list_donations_by_donor(&self, donor_id: Uuid) -> StoreResult<Vec<Donation>>;

    async fn list_donations(&self, query: &DonationQuery) -> StoreResult<Vec<Donation>>;

    async fn list_requests_by_donor(&self, donor_id: Uuid) -> StoreResult<Vec<Request>>;

    async fn list_requests_by_receiver(&self, receiver_id: Uuid) -> StoreResult<Vec<Request>>;

    async fn find_review(&self, donation_id: Uuid, reviewer_id: Uuid)
        -> StoreResult<Option<Review>>;

    async fn list_reviews_for_user(&self, reviewee_id: Uuid) -> StoreResult<Vec<Review>>;

    async fn list_reviews(&self) -> StoreResult<Vec<Review>>;

    async fn list_reports_by_reporter(&self, reporter_id: Uuid) -> StoreResult<Vec<Report>>;

    async fn list_reports_against(&self, user_id: Uuid) -> StoreResult<Vec<Report>>;

    async fn list_reports(&self, status: Option<ReportStatus>) -> StoreResult<Vec<Report>>;

    async fn get_user_stats(&self, user_id: Uuid) -> StoreResult<Option<UserStats>>;

    /// Donors ranked by allotted/picked-up donations created since `since`
    async fn leaderboard(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<LeaderboardEntry>>;

    async fn user_counts(&self) -> StoreResult<UserCounts>;

    async fn donation_counts(&self) -> StoreResult<DonationCounts>;

    /// Sum of quantity over picked-up donations
    async fn food_saved(&self) -> StoreResult<f64>;

    async fn recent_donations(&self, limit: i64) -> StoreResult<Vec<Donation>>;
}

/// One atomic unit of lifecycle work.
///
/// `lock_*` methods read a row and hold it for the rest of the transaction.
/// Callers lock the donation before any of its requests.
#[async_trait]
pub trait LifecycleTx: Send {
    async fn lock_donation(&mut self, id: Uuid) -> StoreResult<Option<Donation>>;

    async fn insert_donation(&mut self, donation: &Donation) -> StoreResult<()>;

    async fn update_donation(&mut self, donation: &Donation) -> StoreResult<()>;

    /// Lock every pending donation whose `expires_at` is not after `now`
    async fn lock_expired_donations(&mut self, now: DateTime<Utc>) -> StoreResult<Vec<Donation>>;

    /// Unlocked read used to learn which donation a request belongs to
    async fn get_request(&mut self, id: Uuid) -> StoreResult<Option<Request>>;

    async fn lock_request(&mut self, id: Uuid) -> StoreResult<Option<Request>>;

    async fn find_request(
        &mut self,
        donation_id: Uuid,
        receiver_id: Uuid,
    ) -> StoreResult<Option<Request>>;

    /// Fails with `StoreError::Duplicate` on a second (donation, receiver) pair
    async fn insert_request(&mut self, request: &Request) -> StoreResult<()>;

    async fn update_request(&mut self, request: &Request) -> StoreResult<()>;

    /// Lock the still-pending requests on a donation, optionally skipping one
    async fn lock_pending_requests(
        &mut self,
        donation_id: Uuid,
        except: Option<Uuid>,
    ) -> StoreResult<Vec<Request>>;

    /// Fails with `StoreError::Duplicate` on a second (donation, reviewer) pair
    async fn insert_review(&mut self, review: &Review) -> StoreResult<()>;

    async fn delete_review(&mut self, id: Uuid) -> StoreResult<Option<Review>>;

    async fn ratings_for(&mut self, reviewee_id: Uuid) -> StoreResult<Vec<i16>>;

    /// Fails with `StoreError::Duplicate` on a second (reporter, donation, type) triple
    async fn insert_report(&mut self, report: &Report) -> StoreResult<()>;

    async fn lock_report(&mut self, id: Uuid) -> StoreResult<Option<Report>>;

    async fn update_report(&mut self, report: &Report) -> StoreResult<()>;

    /// Lock the stats row, creating an empty one when the user has none yet
    async fn lock_user_stats(&mut self, user_id: Uuid) -> StoreResult<UserStats>;

    async fn save_user_stats(&mut self, stats: &UserStats) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
