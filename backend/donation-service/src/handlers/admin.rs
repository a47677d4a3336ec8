/// Admin handlers - moderation and operational endpoints
use actix_web::{web, HttpResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::{ActingUser, Role};
use crate::models::{DonationFilter, ModerateReportInput, ReportFilter};
use crate::services::LifecycleEngine;

pub async fn list_reports(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
    query: web::Query<ReportFilter>,
) -> Result<HttpResponse> {
    user.require(Role::Admin)?;
    let reports = engine.list_reports(query.status.as_deref()).await?;
    Ok(HttpResponse::Ok().json(reports))
}

pub async fn moderate_report(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
    path: web::Path<Uuid>,
    body: web::Json<ModerateReportInput>,
) -> Result<HttpResponse> {
    user.require(Role::Admin)?;
    let report_id = path.into_inner();
    let report = engine.moderate_report(report_id, body.into_inner()).await?;

    tracing::info!(admin_id = %user.id, report_id = %report_id, "Admin moderated report");
    Ok(HttpResponse::Ok().json(report))
}

pub async fn list_reviews(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
) -> Result<HttpResponse> {
    user.require(Role::Admin)?;
    let reviews = engine.list_reviews().await?;
    Ok(HttpResponse::Ok().json(reviews))
}

pub async fn delete_review(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    user.require(Role::Admin)?;
    let review = engine.delete_review(path.into_inner()).await?;

    tracing::info!(admin_id = %user.id, review_id = %review.id, "Admin deleted review");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Review deleted",
        "review": review,
    })))
}

pub async fn list_donations(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
    query: web::Query<DonationFilter>,
) -> Result<HttpResponse> {
    user.require(Role::Admin)?;
    let donations = engine.list_donations(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(donations))
}

/// Run the expiry sweep now instead of waiting for the next tick
pub async fn expire_donations(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
) -> Result<HttpResponse> {
    user.require(Role::Admin)?;
    let sweep = engine.expire_stale_donations(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(sweep))
}
