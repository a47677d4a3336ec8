use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, Result};

/// Kind of food on offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "food_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FoodType {
    Veg,
    NonVeg,
}

/// Unit the donated quantity is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "quantity_unit", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuantityUnit {
    Kg,
    Servings,
    Plates,
    Liters,
}

/// Donation status enum with state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "donation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    Pending,
    Allotted,
    PickedUp,
    Expired,
}

impl DonationStatus {
    /// pending -> allotted -> picked_up, plus pending -> expired. Nothing reverses.
    pub fn can_transition_to(&self, next: DonationStatus) -> bool {
        matches!(
            (self, next),
            (DonationStatus::Pending, DonationStatus::Allotted)
                | (DonationStatus::Pending, DonationStatus::Expired)
                | (DonationStatus::Allotted, DonationStatus::PickedUp)
        )
    }

    /// Statuses in which the donation carries a receiver
    pub fn has_receiver(&self) -> bool {
        matches!(self, DonationStatus::Allotted | DonationStatus::PickedUp)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Allotted => "allotted",
            DonationStatus::PickedUp => "picked_up",
            DonationStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DonationStatus::Pending),
            "allotted" => Some(DonationStatus::Allotted),
            "picked_up" => Some(DonationStatus::PickedUp),
            "expired" => Some(DonationStatus::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: QuantityUnit,
}

/// WGS84 point plus a free-form address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

const EARTH_RADIUS_KM: f64 = 6371.0;

impl GeoPoint {
    /// Great-circle distance in kilometres (haversine)
    pub fn distance_km(&self, lng: f64, lat: f64) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// Food offer posted by a donor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub food_type: FoodType,
    pub food_name: String,
    pub quantity: Quantity,
    pub prepared_time: DateTime<Utc>,
    pub pickup_time_start: DateTime<Utc>,
    pub pickup_time_end: DateTime<Utc>,
    pub location: GeoPoint,
    pub will_deliver: bool,
    pub status: DonationStatus,
    pub receiver_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
}

impl Donation {
    /// Build a new pending donation from validated input
    pub fn new(donor_id: Uuid, input: CreateDonationInput, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            donor_id,
            food_type: input.food_type,
            food_name: input.food_name.trim().to_string(),
            quantity: input.quantity,
            prepared_time: input.prepared_time,
            pickup_time_start: input.pickup_time_start,
            pickup_time_end: input.pickup_time_end,
            location: input.location,
            will_deliver: input.will_deliver,
            status: DonationStatus::Pending,
            receiver_id: None,
            expires_at: input.expires_at,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            picked_up_at: None,
        }
    }

    /// Still open to new requests at `now`
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.status == DonationStatus::Pending && self.expires_at > now
    }

    /// Allot to a receiver (pending -> allotted)
    pub fn allot(&mut self, receiver_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        self.transition(DonationStatus::Allotted, now)?;
        self.receiver_id = Some(receiver_id);
        self.confirmed_at = Some(now);
        Ok(())
    }

    /// Mark picked up (allotted -> picked_up)
    pub fn mark_picked_up(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(DonationStatus::PickedUp, now)?;
        self.picked_up_at = Some(now);
        Ok(())
    }

    /// Expire an unclaimed donation (pending -> expired)
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(DonationStatus::Expired, now)
    }

    fn transition(&mut self, next: DonationStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::conflict(format!(
                "Invalid donation status transition: {} -> {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

/// Request body for creating a donation
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_donation_window"))]
pub struct CreateDonationInput {
    pub food_type: FoodType,
    #[validate(length(min = 1, max = 200, message = "Food name is required"))]
    pub food_name: String,
    #[validate(custom(function = "validate_quantity"))]
    pub quantity: Quantity,
    pub prepared_time: DateTime<Utc>,
    pub pickup_time_start: DateTime<Utc>,
    pub pickup_time_end: DateTime<Utc>,
    #[validate(custom(function = "validate_location"))]
    pub location: GeoPoint,
    #[serde(default)]
    pub will_deliver: bool,
    pub expires_at: DateTime<Utc>,
}

fn validate_quantity(quantity: &Quantity) -> std::result::Result<(), ValidationError> {
    if !quantity.value.is_finite() || quantity.value < 1.0 {
        let mut err = ValidationError::new("quantity");
        err.message = Some("Quantity must be at least 1".into());
        return Err(err);
    }
    Ok(())
}

fn validate_location(location: &GeoPoint) -> std::result::Result<(), ValidationError> {
    if !(-180.0..=180.0).contains(&location.lng) || !(-90.0..=90.0).contains(&location.lat) {
        let mut err = ValidationError::new("location");
        err.message = Some("Coordinates out of range".into());
        return Err(err);
    }
    Ok(())
}

fn validate_donation_window(input: &CreateDonationInput) -> std::result::Result<(), ValidationError> {
    if input.food_name.trim().is_empty() {
        let mut err = ValidationError::new("food_name");
        err.message = Some("Food name is required".into());
        return Err(err);
    }
    if input.pickup_time_end <= input.pickup_time_start {
        let mut err = ValidationError::new("pickup_window");
        err.message = Some("Pickup end must be after pickup start".into());
        return Err(err);
    }
    if input.expires_at < input.pickup_time_end {
        let mut err = ValidationError::new("expires_at");
        err.message = Some("Expiry must not be before the end of the pickup window".into());
        return Err(err);
    }
    Ok(())
}

/// Query string for the nearby listing
#[derive(Debug, Clone, Deserialize)]
pub struct NearbyQuery {
    pub lng: f64,
    pub lat: f64,
    /// Radius in kilometres
    pub radius: Option<f64>,
}

/// Query string for admin donation listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DonationFilter {
    pub status: Option<String>,
    /// Case-insensitive match against the pickup address
    pub area: Option<String>,
    /// Inclusive bounds on `created_at`
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}
