/// Donation handlers - posting, browsing and aggregate views
use actix_web::{web, HttpResponse};

use crate::error::Result;
use crate::middleware::{ActingUser, Role};
use crate::models::{CreateDonationInput, LeaderboardPeriod, LeaderboardQuery, NearbyQuery};
use crate::services::{AggregationService, LifecycleEngine};

/// Post a new donation (donor only)
pub async fn create_donation(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
    body: web::Json<CreateDonationInput>,
) -> Result<HttpResponse> {
    user.require(Role::Donor)?;
    let donation = engine.create_donation(user.id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(donation))
}

/// Pending donations within a radius of a point, nearest first
pub async fn list_nearby(
    engine: web::Data<LifecycleEngine>,
    _user: ActingUser,
    query: web::Query<NearbyQuery>,
) -> Result<HttpResponse> {
    let donations = engine.list_nearby_donations(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(donations))
}

/// The acting donor's donations, newest first
pub async fn my_donations(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
) -> Result<HttpResponse> {
    user.require(Role::Donor)?;
    let donations = engine.list_donor_donations(user.id).await?;
    Ok(HttpResponse::Ok().json(donations))
}

pub async fn leaderboard(
    aggregation: web::Data<AggregationService>,
    query: web::Query<LeaderboardQuery>,
) -> Result<HttpResponse> {
    let period = LeaderboardPeriod::parse(query.period.as_deref());
    let entries = aggregation.leaderboard(period).await?;
    Ok(HttpResponse::Ok().json(entries))
}

pub async fn analytics(aggregation: web::Data<AggregationService>) -> Result<HttpResponse> {
    let analytics = aggregation.analytics().await?;
    Ok(HttpResponse::Ok().json(analytics))
}
