/// Liveness and readiness probes
use actix_web::{web, HttpResponse};
use chrono::Utc;
use std::time::Instant;

use crate::services::LifecycleEngine;

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "donation-service",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Ready once the backing store answers a ping
pub async fn ready(engine: web::Data<LifecycleEngine>) -> HttpResponse {
    let start = Instant::now();
    match engine.store().ping().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "ready": true,
            "latency_ms": start.elapsed().as_millis() as u64,
        })),
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "ready": false,
                "message": "store unavailable",
            }))
        }
    }
}
