use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    provider: &'static str,
}

/// Health check endpoint
///
/// Liveness only: the provider is not contacted.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        provider: "gemini",
    })
}
