/// Review handlers
use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::{ActingUser, REQUESTING_ROLES};
use crate::models::CreateReviewInput;
use crate::services::LifecycleEngine;

pub async fn create_review(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
    body: web::Json<CreateReviewInput>,
) -> Result<HttpResponse> {
    user.require_any(REQUESTING_ROLES)?;
    let review = engine.create_review(user.id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(review))
}

/// Reviews a user has received, newest first
pub async fn user_reviews(
    engine: web::Data<LifecycleEngine>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let reviews = engine.list_user_reviews(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

pub async fn can_review(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let eligibility = engine.can_review(path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(eligibility))
}
