/// Request handlers - receivers ask for food, donors decide
use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use super::optional_json;
use crate::error::Result;
use crate::middleware::{ActingUser, Role, REQUESTING_ROLES};
use crate::models::{CancelRequestInput, CreateRequestInput, DeclineRequestInput};
use crate::services::LifecycleEngine;

pub async fn create_request(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
    body: web::Json<CreateRequestInput>,
) -> Result<HttpResponse> {
    user.require_any(REQUESTING_ROLES)?;
    let request = engine.create_request(user.id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(request))
}

/// Requests made by the acting receiver
pub async fn my_requests(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
) -> Result<HttpResponse> {
    user.require_any(REQUESTING_ROLES)?;
    let requests = engine.list_receiver_requests(user.id).await?;
    Ok(HttpResponse::Ok().json(requests))
}

/// Requests waiting on the acting donor's donations
pub async fn incoming_requests(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
) -> Result<HttpResponse> {
    user.require(Role::Donor)?;
    let requests = engine.list_incoming_requests(user.id).await?;
    Ok(HttpResponse::Ok().json(requests))
}

pub async fn confirm_request(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    user.require(Role::Donor)?;
    let allotment = engine.confirm_request(path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(allotment))
}

pub async fn decline_request(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    user.require(Role::Donor)?;
    let input: DeclineRequestInput = optional_json(&body)?;
    input.validate()?;
    let request = engine
        .decline_request(path.into_inner(), user.id, input.reason)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

pub async fn complete_request(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    user.require(Role::Donor)?;
    let completion = engine.complete_request(path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(completion))
}

pub async fn cancel_request(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    user.require_any(REQUESTING_ROLES)?;
    let input: CancelRequestInput = optional_json(&body)?;
    input.validate()?;
    let request = engine
        .cancel_request(path.into_inner(), user.id, input.reason)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}
