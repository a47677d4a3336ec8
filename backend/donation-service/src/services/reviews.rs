use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::{messages, LifecycleEngine};
use crate::error::{AppError, Result};
use crate::metrics::lifecycle as metrics;
use crate::models::{
    average_rating, CreateReviewInput, DonationStatus, Review, ReviewEligibility, UserStats,
};
use crate::store::{constraints, LifecycleTx};

/// Recompute a user's rating over every review they have received.
/// The stats row is locked before ratings are read so concurrent writers queue.
async fn refresh_rating(
    tx: &mut (dyn LifecycleTx + '_),
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<UserStats> {
    let mut stats = tx.lock_user_stats(user_id).await?;
    let ratings = tx.ratings_for(user_id).await?;
    stats.average_rating = average_rating(&ratings);
    stats.review_count = ratings.len() as i64;
    stats.updated_at = now;
    tx.save_user_stats(&stats).await?;
    Ok(stats)
}

impl LifecycleEngine {
    /// Receiver rates the donor of a picked-up donation
    pub async fn create_review(&self, reviewer_id: Uuid, input: CreateReviewInput) -> Result<Review> {
        let result = self.try_create_review(reviewer_id, input, Utc::now()).await;
        metrics::record_operation("create_review", &result);
        result
    }

    async fn try_create_review(
        &self,
        reviewer_id: Uuid,
        input: CreateReviewInput,
        now: DateTime<Utc>,
    ) -> Result<Review> {
        input.validate()?;

        let mut tx = self.store.begin().await?;
        let donation = tx
            .lock_donation(input.donation_id)
            .await?
            .ok_or_else(|| AppError::not_found(messages::DONATION_NOT_FOUND))?;

        if donation.receiver_id != Some(reviewer_id) {
            return Err(AppError::forbidden(messages::ONLY_RECEIVER_CAN_REVIEW));
        }
        if donation.status != DonationStatus::PickedUp {
            return Err(AppError::conflict(messages::REVIEW_REQUIRES_PICKUP));
        }

        let review = Review::new(donation.id, reviewer_id, donation.donor_id, &input, now);
        tx.insert_review(&review).await.map_err(|err| {
            if err.is_duplicate(constraints::REVIEW_DONATION_REVIEWER) {
                AppError::conflict(messages::ALREADY_REVIEWED)
            } else {
                err.into()
            }
        })?;

        if let Some(mut request) = tx.find_request(donation.id, reviewer_id).await? {
            request.reviewed = true;
            request.updated_at = now;
            tx.update_request(&request).await?;
        }

        let stats = refresh_rating(tx.as_mut(), donation.donor_id, now).await?;
        tx.commit().await?;

        tracing::info!(
            review_id = %review.id,
            donation_id = %donation.id,
            reviewee_id = %donation.donor_id,
            rating = review.rating,
            average_rating = stats.average_rating,
            "Review created"
        );
        Ok(review)
    }

    /// Read-only version of the create-review checks, for the front end
    pub async fn can_review(&self, donation_id: Uuid, user_id: Uuid) -> Result<ReviewEligibility> {
        let Some(donation) = self.store.get_donation(donation_id).await? else {
            return Ok(ReviewEligibility::denied(messages::DONATION_NOT_FOUND));
        };

        if donation.receiver_id != Some(user_id) {
            return Ok(ReviewEligibility::denied(messages::ONLY_RECEIVER_CAN_REVIEW));
        }
        if donation.status != DonationStatus::PickedUp {
            return Ok(ReviewEligibility::denied("Donation not completed yet"));
        }

        if let Some(existing) = self.store.find_review(donation_id, user_id).await? {
            return Ok(ReviewEligibility {
                can_review: false,
                message: "Already reviewed".to_string(),
                review: Some(existing),
            });
        }

        Ok(ReviewEligibility {
            can_review: true,
            message: "You can review this donation".to_string(),
            review: None,
        })
    }

    /// Admin removes a review; the reviewee's average is recomputed and the
    /// receiver may review the donation again
    pub async fn delete_review(&self, review_id: Uuid) -> Result<Review> {
        let result = self.try_delete_review(review_id, Utc::now()).await;
        metrics::record_operation("delete_review", &result);
        result
    }

    async fn try_delete_review(&self, review_id: Uuid, now: DateTime<Utc>) -> Result<Review> {
        let mut tx = self.store.begin().await?;
        let review = tx
            .delete_review(review_id)
            .await?
            .ok_or_else(|| AppError::not_found(messages::REVIEW_NOT_FOUND))?;

        // Donation before request, same order as every other transition
        tx.lock_donation(review.donation_id).await?;
        let request = tx
            .find_request(review.donation_id, review.reviewer_id)
            .await?;
        if let Some(mut request) = request {
            request.reviewed = false;
            request.updated_at = now;
            tx.update_request(&request).await?;
        }

        let stats = refresh_rating(tx.as_mut(), review.reviewee_id, now).await?;
        tx.commit().await?;

        tracing::info!(
            review_id = %review.id,
            reviewee_id = %review.reviewee_id,
            average_rating = stats.average_rating,
            review_count = stats.review_count,
            "Review deleted by admin"
        );
        Ok(review)
    }

    pub async fn list_user_reviews(&self, user_id: Uuid) -> Result<Vec<Review>> {
        Ok(self.store.list_reviews_for_user(user_id).await?)
    }

    pub async fn list_reviews(&self) -> Result<Vec<Review>> {
        Ok(self.store.list_reviews().await?)
    }

    pub async fn get_user_stats(&self, user_id: Uuid) -> Result<Option<UserStats>> {
        Ok(self.store.get_user_stats(user_id).await?)
    }
}
