use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::donation::Donation;

/// Per-user derived figures. The user directory itself lives in the identity service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_id: Uuid,
    pub average_rating: f64,
    pub review_count: i64,
    pub total_donations: i64,
    pub total_quantity_donated: f64,
    pub updated_at: DateTime<Utc>,
}

impl UserStats {
    pub fn empty(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            average_rating: 0.0,
            review_count: 0,
            total_donations: 0,
            total_quantity_donated: 0.0,
            updated_at: now,
        }
    }
}

/// Leaderboard window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardPeriod {
    Week,
    Month,
    AllTime,
}

impl LeaderboardPeriod {
    /// Unknown values fall back to all time
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            None | Some("week") => LeaderboardPeriod::Week,
            Some("month") => LeaderboardPeriod::Month,
            Some(_) => LeaderboardPeriod::AllTime,
        }
    }

    /// Inclusive lower bound on `created_at`
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            LeaderboardPeriod::Week => now - chrono::Duration::days(7),
            LeaderboardPeriod::Month => now
                .checked_sub_months(chrono::Months::new(1))
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            LeaderboardPeriod::AllTime => DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub donor_id: Uuid,
    pub total_donations: i64,
    pub total_quantity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCounts {
    pub total_donors: i64,
    pub total_receivers: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationCounts {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Impact {
    pub food_saved: f64,
    pub meals_provided: i64,
}

impl Impact {
    /// Meals estimate used on the landing page: 1.5 meals per unit saved
    pub fn from_food_saved(food_saved: f64) -> Self {
        Self {
            food_saved,
            meals_provided: (food_saved * 1.5).floor() as i64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub users: UserCounts,
    pub donations: DonationCounts,
    pub impact: Impact,
    pub recent_activity: Vec<Donation>,
}
