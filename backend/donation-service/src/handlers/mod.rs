/// HTTP handlers for donation-service
///
/// This module contains handlers for:
/// - Donations: post, browse nearby, leaderboard and analytics
/// - Requests: create, confirm, decline, complete, cancel
/// - Reviews and reports filed after a handover
/// - Admin moderation and the manual expiry sweep
pub mod admin;
pub mod donations;
pub mod health;
pub mod reports;
pub mod requests;
pub mod reviews;

use actix_web::{error::InternalError, web, HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::metrics::serve_metrics;

fn json_error(err: actix_web::error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let app_err = AppError::validation(err.to_string());
    let response = actix_web::ResponseError::error_response(&app_err);
    InternalError::from_response(err, response).into()
}

fn query_error(err: actix_web::error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let app_err = AppError::validation(err.to_string());
    let response = actix_web::ResponseError::error_response(&app_err);
    InternalError::from_response(err, response).into()
}

fn path_error(err: actix_web::error::PathError, _req: &HttpRequest) -> actix_web::Error {
    let app_err = AppError::validation(err.to_string());
    let response = actix_web::ResponseError::error_response(&app_err);
    InternalError::from_response(err, response).into()
}

/// Body that may be left out entirely. An empty payload yields the default;
/// anything else must parse, so a malformed body never falls back silently.
pub(crate) fn optional_json<T>(body: &web::Bytes) -> Result<T, AppError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| AppError::validation(format!("Invalid JSON body: {}", err)))
}

/// Register every route plus extractor configs that render as validation errors
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(64 * 1024).error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .route("/health", web::get().to(health::health))
        .route("/ready", web::get().to(health::ready))
        .route("/metrics", web::get().to(serve_metrics))
        .service(
            web::scope("/api/v1")
                .service(
                    web::scope("/donations")
                        .route("", web::post().to(donations::create_donation))
                        .route("/nearby", web::get().to(donations::list_nearby))
                        .route("/my-donations", web::get().to(donations::my_donations))
                        .route("/leaderboard", web::get().to(donations::leaderboard))
                        .route("/analytics", web::get().to(donations::analytics)),
                )
                .service(
                    web::scope("/requests")
                        .route("", web::post().to(requests::create_request))
                        .route("/my-requests", web::get().to(requests::my_requests))
                        .route("/incoming", web::get().to(requests::incoming_requests))
                        .route("/{id}/confirm", web::put().to(requests::confirm_request))
                        .route("/{id}/decline", web::put().to(requests::decline_request))
                        .route("/{id}/complete", web::put().to(requests::complete_request))
                        .route("/{id}/cancel", web::put().to(requests::cancel_request)),
                )
                .service(
                    web::scope("/reviews")
                        .route("", web::post().to(reviews::create_review))
                        .route("/user/{user_id}", web::get().to(reviews::user_reviews))
                        .route(
                            "/can-review/{donation_id}",
                            web::get().to(reviews::can_review),
                        ),
                )
                .service(
                    web::scope("/reports")
                        .route("", web::post().to(reports::create_report))
                        .route("/my-reports", web::get().to(reports::my_reports))
                        .route("/against-me", web::get().to(reports::reports_against_me)),
                )
                .service(
                    web::scope("/admin")
                        .route("/reports", web::get().to(admin::list_reports))
                        .route(
                            "/reports/{id}/status",
                            web::post().to(admin::moderate_report),
                        )
                        .route("/reviews", web::get().to(admin::list_reviews))
                        .route("/reviews/{id}", web::delete().to(admin::delete_review))
                        .route("/donations", web::get().to(admin::list_donations))
                        .route(
                            "/donations/expire",
                            web::post().to(admin::expire_donations),
                        ),
                ),
        );
}

/// Fallback for unknown routes, rendered like every other error
pub async fn not_found() -> HttpResponse {
    actix_web::ResponseError::error_response(&AppError::not_found("Route not found"))
}
