use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::db::ping;
use crate::AppState;

/// Liveness: the process is up and serving.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness: the database answers a trivial query.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match ping(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ready", "checks": { "database": "ok" } })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "not_ready", "checks": { "database": "failed" } })),
            )
        }
    }
}
