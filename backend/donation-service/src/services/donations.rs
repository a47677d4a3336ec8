use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::{messages, LifecycleEngine};
use crate::error::{AppError, Result};
use crate::metrics::lifecycle as metrics;
use crate::models::{CreateDonationInput, Donation, DonationFilter, DonationStatus, NearbyQuery};
use crate::store::{DonationQuery, RadiusQuery};

impl LifecycleEngine {
    /// Post a new pending donation and credit it to the donor's stats
    pub async fn create_donation(
        &self,
        donor_id: Uuid,
        input: CreateDonationInput,
    ) -> Result<Donation> {
        let result = self.try_create_donation(donor_id, input, Utc::now()).await;
        metrics::record_operation("create_donation", &result);
        result
    }

    async fn try_create_donation(
        &self,
        donor_id: Uuid,
        input: CreateDonationInput,
        now: DateTime<Utc>,
    ) -> Result<Donation> {
        input.validate()?;
        let donation = Donation::new(donor_id, input, now);

        let mut tx = self.store.begin().await?;
        tx.insert_donation(&donation).await?;

        let mut stats = tx.lock_user_stats(donor_id).await?;
        stats.total_donations += 1;
        stats.total_quantity_donated += donation.quantity.value;
        stats.updated_at = now;
        tx.save_user_stats(&stats).await?;

        tx.commit().await?;

        tracing::info!(
            donation_id = %donation.id,
            donor_id = %donor_id,
            quantity = donation.quantity.value,
            expires_at = %donation.expires_at,
            "Donation created"
        );
        Ok(donation)
    }

    pub async fn get_donation(&self, donation_id: Uuid) -> Result<Donation> {
        self.store
            .get_donation(donation_id)
            .await?
            .ok_or_else(|| AppError::not_found(messages::DONATION_NOT_FOUND))
    }

    /// Pending, unexpired donations around a point, nearest first
    pub async fn list_nearby_donations(&self, query: NearbyQuery) -> Result<Vec<Donation>> {
        if !(-180.0..=180.0).contains(&query.lng) || !(-90.0..=90.0).contains(&query.lat) {
            return Err(AppError::validation("Coordinates out of range"));
        }
        let radius_km = match query.radius {
            Some(r) if r.is_finite() && r > 0.0 => r,
            Some(_) => return Err(AppError::validation("Radius must be a positive number")),
            None => self.nearby_radius_km,
        };

        let donations = self
            .store
            .list_nearby_donations(
                RadiusQuery {
                    lng: query.lng,
                    lat: query.lat,
                    radius_km,
                },
                Utc::now(),
            )
            .await?;

        tracing::debug!(
            lng = query.lng,
            lat = query.lat,
            radius_km,
            found = donations.len(),
            "Nearby donations listed"
        );
        Ok(donations)
    }

    pub async fn list_donor_donations(&self, donor_id: Uuid) -> Result<Vec<Donation>> {
        Ok(self.store.list_donations_by_donor(donor_id).await?)
    }

    /// Admin listing filtered by status, address area and creation window
    pub async fn list_donations(&self, filter: DonationFilter) -> Result<Vec<Donation>> {
        let status = match filter.status.as_deref() {
            Some(s) => Some(
                DonationStatus::parse(s)
                    .ok_or_else(|| AppError::validation("Invalid donation status"))?,
            ),
            None => None,
        };
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(AppError::validation("'from' must not be after 'to'"));
            }
        }
        let area = filter
            .area
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        let query = DonationQuery {
            status,
            area,
            created_from: filter.from,
            created_to: filter.to,
        };
        Ok(self.store.list_donations(&query).await?)
    }
}
