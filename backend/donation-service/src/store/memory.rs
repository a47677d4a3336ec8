//! In-memory lifecycle store.
//!
//! All transactions serialize behind one async mutex. A transaction works on a
//! private copy of the state and writes it back on commit, so dropping it rolls
//! everything back.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{
    constraints, DonationQuery, LifecycleStore, LifecycleTx, RadiusQuery, StoreError, StoreResult,
};
use crate::models::{
    Donation, DonationCounts, DonationStatus, LeaderboardEntry, Report, ReportStatus, Request,
    RequestStatus, Review, UserCounts, UserStats,
};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    donations: HashMap<Uuid, Donation>,
    requests: HashMap<Uuid, Request>,
    reviews: HashMap<Uuid, Review>,
    reports: HashMap<Uuid, Report>,
    user_stats: HashMap<Uuid, UserStats>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate(constraint: &str) -> StoreError {
    StoreError::Duplicate {
        constraint: constraint.to_string(),
    }
}

fn newest_first<T, F>(mut items: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items
}

#[async_trait]
impl LifecycleStore for InMemoryStore {
    async fn begin<'a>(&'a self) -> StoreResult<Box<dyn LifecycleTx + 'a>> {
        let guard = self.state.lock().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn get_donation(&self, id: Uuid) -> StoreResult<Option<Donation>> {
        Ok(self.state.lock().await.donations.get(&id).cloned())
    }

    async fn list_nearby_donations(
        &self,
        query: RadiusQuery,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Donation>> {
        let state = self.state.lock().await;
        let mut nearby: Vec<(f64, Donation)> = state
            .donations
            .values()
            .filter(|d| d.is_available(now))
            .map(|d| (d.location.distance_km(query.lng, query.lat), d.clone()))
            .filter(|(distance, _)| *distance <= query.radius_km)
            .collect();

        nearby.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        Ok(nearby.into_iter().map(|(_, d)| d).collect())
    }

    async fn list_donations_by_donor(&self, donor_id: Uuid) -> StoreResult<Vec<Donation>> {
        let state = self.state.lock().await;
        let items = state
            .donations
            .values()
            .filter(|d| d.donor_id == donor_id)
            .cloned()
            .collect();
        Ok(newest_first(items, |d: &Donation| d.created_at))
    }

    async fn list_donations(&self, query: &DonationQuery) -> StoreResult<Vec<Donation>> {
        let area = query.area.as_deref().map(str::to_lowercase);
        let state = self.state.lock().await;
        let items = state
            .donations
            .values()
            .filter(|d| query.status.map_or(true, |s| d.status == s))
            .filter(|d| match &area {
                Some(area) => d
                    .location
                    .address
                    .as_deref()
                    .is_some_and(|addr| addr.to_lowercase().contains(area.as_str())),
                None => true,
            })
            .filter(|d| query.created_from.map_or(true, |from| d.created_at >= from))
            .filter(|d| query.created_to.map_or(true, |to| d.created_at <= to))
            .cloned()
            .collect();
        Ok(newest_first(items, |d: &Donation| d.created_at))
    }

    async fn list_requests_by_donor(&self, donor_id: Uuid) -> StoreResult<Vec<Request>> {
        let state = self.state.lock().await;
        let items = state
            .requests
            .values()
            .filter(|r| r.donor_id == donor_id)
            .cloned()
            .collect();
        Ok(newest_first(items, |r: &Request| r.created_at))
    }

    async fn list_requests_by_receiver(&self, receiver_id: Uuid) -> StoreResult<Vec<Request>> {
        let state = self.state.lock().await;
        let items = state
            .requests
            .values()
            .filter(|r| r.receiver_id == receiver_id)
            .cloned()
            .collect();
        Ok(newest_first(items, |r: &Request| r.created_at))
    }

    async fn find_review(
        &self,
        donation_id: Uuid,
        reviewer_id: Uuid,
    ) -> StoreResult<Option<Review>> {
        let state = self.state.lock().await;
        Ok(state
            .reviews
            .values()
            .find(|r| r.donation_id == donation_id && r.reviewer_id == reviewer_id)
            .cloned())
    }

    async fn list_reviews_for_user(&self, reviewee_id: Uuid) -> StoreResult<Vec<Review>> {
        let state = self.state.lock().await;
        let items = state
            .reviews
            .values()
            .filter(|r| r.reviewee_id == reviewee_id)
            .cloned()
            .collect();
        Ok(newest_first(items, |r: &Review| r.created_at))
    }

    async fn list_reviews(&self) -> StoreResult<Vec<Review>> {
        let state = self.state.lock().await;
        let items = state.reviews.values().cloned().collect();
        Ok(newest_first(items, |r: &Review| r.created_at))
    }

    async fn list_reports_by_reporter(&self, reporter_id: Uuid) -> StoreResult<Vec<Report>> {
        let state = self.state.lock().await;
        let items = state
            .reports
            .values()
            .filter(|r| r.reporter_id == reporter_id)
            .cloned()
            .collect();
        Ok(newest_first(items, |r: &Report| r.created_at))
    }

    async fn list_reports_against(&self, user_id: Uuid) -> StoreResult<Vec<Report>> {
        let state = self.state.lock().await;
        let items = state
            .reports
            .values()
            .filter(|r| r.reported_user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(items, |r: &Report| r.created_at))
    }

    async fn list_reports(&self, status: Option<ReportStatus>) -> StoreResult<Vec<Report>> {
        let state = self.state.lock().await;
        let items = state
            .reports
            .values()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        Ok(newest_first(items, |r: &Report| r.created_at))
    }

    async fn get_user_stats(&self, user_id: Uuid) -> StoreResult<Option<UserStats>> {
        Ok(self.state.lock().await.user_stats.get(&user_id).cloned())
    }

    async fn leaderboard(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<LeaderboardEntry>> {
        let state = self.state.lock().await;
        let mut by_donor: HashMap<Uuid, LeaderboardEntry> = HashMap::new();

        for donation in state.donations.values().filter(|d| {
            d.status.has_receiver() && d.created_at >= since
        }) {
            let entry = by_donor
                .entry(donation.donor_id)
                .or_insert_with(|| LeaderboardEntry {
                    donor_id: donation.donor_id,
                    total_donations: 0,
                    total_quantity: 0.0,
                });
            entry.total_donations += 1;
            entry.total_quantity += donation.quantity.value;
        }

        let mut entries: Vec<LeaderboardEntry> = by_donor.into_values().collect();
        entries.sort_by(|a, b| {
            b.total_donations
                .cmp(&a.total_donations)
                .then_with(|| {
                    b.total_quantity
                        .partial_cmp(&a.total_quantity)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.donor_id.cmp(&b.donor_id))
        });
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn user_counts(&self) -> StoreResult<UserCounts> {
        let state = self.state.lock().await;
        let donors: HashSet<Uuid> = state.donations.values().map(|d| d.donor_id).collect();
        let receivers: HashSet<Uuid> = state.requests.values().map(|r| r.receiver_id).collect();
        let total = donors.union(&receivers).count() as i64;

        Ok(UserCounts {
            total_donors: donors.len() as i64,
            total_receivers: receivers.len() as i64,
            total,
        })
    }

    async fn donation_counts(&self) -> StoreResult<DonationCounts> {
        let state = self.state.lock().await;
        let count = |status: DonationStatus| {
            state.donations.values().filter(|d| d.status == status).count() as i64
        };

        Ok(DonationCounts {
            total: state.donations.len() as i64,
            completed: count(DonationStatus::PickedUp),
            pending: count(DonationStatus::Pending),
        })
    }

    async fn food_saved(&self) -> StoreResult<f64> {
        let state = self.state.lock().await;
        Ok(state
            .donations
            .values()
            .filter(|d| d.status == DonationStatus::PickedUp)
            .map(|d| d.quantity.value)
            .sum())
    }

    async fn recent_donations(&self, limit: i64) -> StoreResult<Vec<Donation>> {
        let state = self.state.lock().await;
        let items = state.donations.values().cloned().collect();
        let mut recent = newest_first(items, |d: &Donation| d.created_at);
        recent.truncate(limit.max(0) as usize);
        Ok(recent)
    }
}

/// Holds the writer lock for its whole lifetime
struct MemoryTx<'a> {
    guard: MutexGuard<'a, MemoryState>,
    work: MemoryState,
}

#[async_trait]
impl<'a> LifecycleTx for MemoryTx<'a> {
    async fn lock_donation(&mut self, id: Uuid) -> StoreResult<Option<Donation>> {
        Ok(self.work.donations.get(&id).cloned())
    }

    async fn insert_donation(&mut self, donation: &Donation) -> StoreResult<()> {
        self.work.donations.insert(donation.id, donation.clone());
        Ok(())
    }

    async fn update_donation(&mut self, donation: &Donation) -> StoreResult<()> {
        if let Some(existing) = self.work.donations.get_mut(&donation.id) {
            *existing = donation.clone();
        }
        Ok(())
    }

    async fn lock_expired_donations(&mut self, now: DateTime<Utc>) -> StoreResult<Vec<Donation>> {
        Ok(self
            .work
            .donations
            .values()
            .filter(|d| d.status == DonationStatus::Pending && d.expires_at <= now)
            .cloned()
            .collect())
    }

    async fn get_request(&mut self, id: Uuid) -> StoreResult<Option<Request>> {
        Ok(self.work.requests.get(&id).cloned())
    }

    async fn lock_request(&mut self, id: Uuid) -> StoreResult<Option<Request>> {
        Ok(self.work.requests.get(&id).cloned())
    }

    async fn find_request(
        &mut self,
        donation_id: Uuid,
        receiver_id: Uuid,
    ) -> StoreResult<Option<Request>> {
        Ok(self
            .work
            .requests
            .values()
            .find(|r| r.donation_id == donation_id && r.receiver_id == receiver_id)
            .cloned())
    }

    async fn insert_request(&mut self, request: &Request) -> StoreResult<()> {
        let exists = self.work.requests.values().any(|r| {
            r.donation_id == request.donation_id && r.receiver_id == request.receiver_id
        });
        if exists {
            return Err(duplicate(constraints::REQUEST_DONATION_RECEIVER));
        }
        self.work.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn update_request(&mut self, request: &Request) -> StoreResult<()> {
        let is_winner = |status: RequestStatus| {
            matches!(status, RequestStatus::Confirmed | RequestStatus::Completed)
        };
        if is_winner(request.status) {
            let rival = self.work.requests.values().any(|r| {
                r.id != request.id && r.donation_id == request.donation_id && is_winner(r.status)
            });
            if rival {
                return Err(duplicate(constraints::REQUEST_ONE_WINNER));
            }
        }
        if let Some(existing) = self.work.requests.get_mut(&request.id) {
            *existing = request.clone();
        }
        Ok(())
    }

    async fn lock_pending_requests(
        &mut self,
        donation_id: Uuid,
        except: Option<Uuid>,
    ) -> StoreResult<Vec<Request>> {
        let pending = self
            .work
            .requests
            .values()
            .filter(|r| {
                r.donation_id == donation_id
                    && r.status == RequestStatus::Pending
                    && Some(r.id) != except
            })
            .cloned()
            .collect();
        Ok(newest_first(pending, |r: &Request| r.created_at))
    }

    async fn insert_review(&mut self, review: &Review) -> StoreResult<()> {
        let exists = self.work.reviews.values().any(|r| {
            r.donation_id == review.donation_id && r.reviewer_id == review.reviewer_id
        });
        if exists {
            return Err(duplicate(constraints::REVIEW_DONATION_REVIEWER));
        }
        self.work.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn delete_review(&mut self, id: Uuid) -> StoreResult<Option<Review>> {
        Ok(self.work.reviews.remove(&id))
    }

    async fn ratings_for(&mut self, reviewee_id: Uuid) -> StoreResult<Vec<i16>> {
        Ok(self
            .work
            .reviews
            .values()
            .filter(|r| r.reviewee_id == reviewee_id)
            .map(|r| r.rating)
            .collect())
    }

    async fn insert_report(&mut self, report: &Report) -> StoreResult<()> {
        let exists = self.work.reports.values().any(|r| {
            r.reporter_id == report.reporter_id
                && r.donation_id == report.donation_id
                && r.report_type == report.report_type
        });
        if exists {
            return Err(duplicate(constraints::REPORT_REPORTER_DONATION_TYPE));
        }
        self.work.reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn lock_report(&mut self, id: Uuid) -> StoreResult<Option<Report>> {
        Ok(self.work.reports.get(&id).cloned())
    }

    async fn update_report(&mut self, report: &Report) -> StoreResult<()> {
        if let Some(existing) = self.work.reports.get_mut(&report.id) {
            *existing = report.clone();
        }
        Ok(())
    }

    async fn lock_user_stats(&mut self, user_id: Uuid) -> StoreResult<UserStats> {
        Ok(self
            .work
            .user_stats
            .entry(user_id)
            .or_insert_with(|| UserStats::empty(user_id, Utc::now()))
            .clone())
    }

    async fn save_user_stats(&mut self, stats: &UserStats) -> StoreResult<()> {
        self.work.user_stats.insert(stats.user_id, stats.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}
