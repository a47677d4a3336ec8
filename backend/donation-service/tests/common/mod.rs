//! Shared fixtures for donation-service integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use donation_service::models::{
    CreateDonationInput, CreateRequestInput, CreateReviewInput, Donation, FoodQuality, FoodType,
    GeoPoint, Quantity, QuantityUnit, Request,
};
use donation_service::services::{AggregationService, LifecycleEngine};
use donation_service::store::{InMemoryStore, LifecycleStore};
use std::sync::Arc;
use uuid::Uuid;

pub fn memory_engine() -> (LifecycleEngine, AggregationService) {
    let store: Arc<dyn LifecycleStore> = Arc::new(InMemoryStore::new());
    (
        LifecycleEngine::new(store.clone()),
        AggregationService::new(store),
    )
}

/// Ten servings on MG Road, Bengaluru, open for six hours
pub fn donation_input(now: DateTime<Utc>) -> CreateDonationInput {
    CreateDonationInput {
        food_type: FoodType::Veg,
        food_name: "Vegetable biryani".to_string(),
        quantity: Quantity {
            value: 10.0,
            unit: QuantityUnit::Servings,
        },
        prepared_time: now - Duration::hours(1),
        pickup_time_start: now,
        pickup_time_end: now + Duration::hours(3),
        location: GeoPoint {
            lng: 77.5946,
            lat: 12.9716,
            address: Some("MG Road, Bengaluru".to_string()),
        },
        will_deliver: false,
        expires_at: now + Duration::hours(6),
    }
}

pub fn request_input(donation_id: Uuid) -> CreateRequestInput {
    CreateRequestInput {
        donation_id,
        note: Some("Can collect within the hour".to_string()),
    }
}

pub fn review_input(donation_id: Uuid, rating: i16) -> CreateReviewInput {
    CreateReviewInput {
        donation_id,
        rating,
        comment: Some("Fresh and well packed".to_string()),
        food_quality: Some(FoodQuality::Good),
    }
}

pub async fn post_donation(engine: &LifecycleEngine, donor: Uuid) -> Donation {
    engine
        .create_donation(donor, donation_input(Utc::now()))
        .await
        .expect("create donation")
}

pub async fn request_donation(engine: &LifecycleEngine, donation: &Donation, receiver: Uuid) -> Request {
    engine
        .create_request(receiver, request_input(donation.id))
        .await
        .expect("create request")
}

/// Post, request, confirm and complete: returns the picked-up donation
pub async fn handed_over(engine: &LifecycleEngine, donor: Uuid, receiver: Uuid) -> Donation {
    let donation = post_donation(engine, donor).await;
    let request = request_donation(engine, &donation, receiver).await;
    engine
        .confirm_request(request.id, donor)
        .await
        .expect("confirm request");
    engine
        .complete_request(request.id, donor)
        .await
        .expect("complete request")
        .donation
}
