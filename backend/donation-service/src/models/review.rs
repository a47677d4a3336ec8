use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "food_quality", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FoodQuality {
    Excellent,
    Good,
    Average,
    Poor,
}

/// Receiver's review of a completed donation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub donation_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub food_quality: Option<FoodQuality>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        donation_id: Uuid,
        reviewer_id: Uuid,
        reviewee_id: Uuid,
        input: &CreateReviewInput,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            donation_id,
            reviewer_id,
            reviewee_id,
            rating: input.rating,
            comment: input
                .comment
                .as_ref()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            food_quality: input.food_quality,
            created_at: now,
        }
    }
}

/// Arithmetic mean over every rating; 0.0 when there are none
pub fn average_rating(ratings: &[i16]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    sum as f64 / ratings.len() as f64
}

/// Request body for creating a review
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewInput {
    pub donation_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(max = 500, message = "Comment must be at most 500 characters"))]
    pub comment: Option<String>,
    pub food_quality: Option<FoodQuality>,
}

/// Result of a review eligibility check
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEligibility {
    pub can_review: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
}

impl ReviewEligibility {
    pub fn denied(message: &str) -> Self {
        Self {
            can_review: false,
            message: message.to_string(),
            review: None,
        }
    }
}
