//! Read-only aggregates over donations: donor leaderboard and landing-page analytics

use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::models::{Analytics, Impact, LeaderboardEntry, LeaderboardPeriod};
use crate::store::LifecycleStore;

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;

/// Donations shown in the analytics activity feed
const RECENT_ACTIVITY_LIMIT: i64 = 5;

#[derive(Clone)]
pub struct AggregationService {
    store: Arc<dyn LifecycleStore>,
    leaderboard_limit: i64,
}

impl AggregationService {
    pub fn new(store: Arc<dyn LifecycleStore>) -> Self {
        Self {
            store,
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
        }
    }

    pub fn with_leaderboard_limit(mut self, limit: i64) -> Self {
        self.leaderboard_limit = limit.max(1);
        self
    }

    /// Top donors by allotted or picked-up donations created within the period
    pub async fn leaderboard(&self, period: LeaderboardPeriod) -> Result<Vec<LeaderboardEntry>> {
        let since = period.start(Utc::now());
        let entries = self.store.leaderboard(since, self.leaderboard_limit).await?;

        tracing::debug!(?period, since = %since, donors = entries.len(), "Leaderboard computed");
        Ok(entries)
    }

    pub async fn analytics(&self) -> Result<Analytics> {
        let users = self.store.user_counts().await?;
        let donations = self.store.donation_counts().await?;
        let food_saved = self.store.food_saved().await?;
        let recent_activity = self.store.recent_donations(RECENT_ACTIVITY_LIMIT).await?;

        Ok(Analytics {
            users,
            donations,
            impact: Impact::from_food_saved(food_saved),
            recent_activity,
        })
    }
}
