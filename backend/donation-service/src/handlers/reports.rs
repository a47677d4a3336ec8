/// Report handlers
use actix_web::{web, HttpResponse};

use crate::error::Result;
use crate::middleware::{ActingUser, Role};
use crate::models::CreateReportInput;
use crate::services::LifecycleEngine;

const REPORT_SUBMITTED: &str = "Report submitted successfully. We will review it shortly.";

pub async fn create_report(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
    body: web::Json<CreateReportInput>,
) -> Result<HttpResponse> {
    // Type-specific donor/receiver checks happen against the donation itself
    user.require_any(&[Role::Donor, Role::Receiver, Role::NgoVolunteer])?;
    let report = engine.create_report(user.id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": REPORT_SUBMITTED,
        "report": report,
    })))
}

pub async fn my_reports(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
) -> Result<HttpResponse> {
    let reports = engine.list_reporter_reports(user.id).await?;
    Ok(HttpResponse::Ok().json(reports))
}

pub async fn reports_against_me(
    engine: web::Data<LifecycleEngine>,
    user: ActingUser,
) -> Result<HttpResponse> {
    let reports = engine.list_reports_against(user.id).await?;
    Ok(HttpResponse::Ok().json(reports))
}
