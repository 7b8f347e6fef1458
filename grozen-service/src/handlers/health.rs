use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Health check endpoint for Docker/K8s liveness probes.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "grozen-service",
                "version": env!("CARGO_PKG_VERSION"),
                "provider": state.text_provider.name(),
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "service": "grozen-service",
                "error": e.to_string()
            })),
        ),
    }
}

/// Readiness: database reachable and the text model backend answering.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = state.db.health_check().await {
        tracing::warn!(error = %e, "Readiness check failed: database");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    if let Err(e) = state.text_provider.health_check().await {
        tracing::warn!(error = %e, "Readiness check failed: text provider");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}
