use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AxumAppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    database: String,
    coordinator: String,
}

/// Health check endpoint
pub async fn health_handler(
    Extension(state): Extension<AxumAppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let db_status = match sqlx::query("SELECT 1").execute(&state.db_pool).await {
        Ok(_) => "ok",
        Err(_) => "error",
    };

    let redis_status = match state.coordinator.ping().await {
        Ok(_) => "ok",
        Err(_) => "error",
    };

    let healthy = db_status == "ok" && redis_status == "ok";

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            database: db_status.to_string(),
            coordinator: redis_status.to_string(),
        }),
    )
}
