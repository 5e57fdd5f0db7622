use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use sea_orm::{ConnectionTrait, Statement};
use serde_json::{json, Value};
use tracing::error;

use crate::health::{CheckStatus, HealthReport};
use crate::server::app::AppState;

/// Full probe report; 503 when any probe failed.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.health.run().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

/// Storage ping for load balancers.
pub async fn health_check_simple(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let backend = state.db.get_database_backend();
    match state
        .db
        .execute(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
    {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "OK",
                "timestamp": Utc::now().to_rfc3339()
            })),
        ),
        Err(err) => {
            error!("Simple health check failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "ERROR",
                    "message": err.to_string(),
                    "timestamp": Utc::now().to_rfc3339()
                })),
            )
        }
    }
}

/// Ready once the storage probe reports fully healthy.
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let report = state.health.run_only(&["database"]).await;
    let ready = !report.checks.is_empty()
        && report
            .checks
            .values()
            .all(|check| check.status == CheckStatus::Healthy);

    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        status,
        Json(json!({
            "status": label,
            "checks": report.checks,
            "timestamp": Utc::now().to_rfc3339()
        })),
    )
}

pub async fn liveness_check() -> Json<Value> {
    Json(json!({
        "status": "alive",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339()
    }))
}
