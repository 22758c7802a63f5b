//! Driver presence endpoints: location heartbeats, availability, nearby
//! lookup.

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::domains::drivers::presence::NearbyDriver;
use crate::server::app::AxumAppState;
use crate::server::auth::AuthAccount;

#[derive(Debug, Deserialize)]
pub struct LocationBody {
    pub latitude: f64,
    pub longitude: f64,
    pub speed: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct OnlineStatusBody {
    pub is_online: bool,
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: Option<f64>,
    pub limit: Option<usize>,
}

fn store_error(e: anyhow::Error) -> (StatusCode, Json<Value>) {
    error!("presence operation failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "presence index unavailable" })),
    )
}

/// POST /api/drivers/location
pub async fn location_handler(
    Extension(state): Extension<AxumAppState>,
    AuthAccount(driver): AuthAccount,
    Json(body): Json<LocationBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    debug!(
        driver = %driver,
        lat = body.latitude,
        lng = body.longitude,
        speed = ?body.speed,
        at = ?body.timestamp,
        "driver location heartbeat"
    );

    state
        .deps
        .presence
        .heartbeat(&driver, body.latitude, body.longitude)
        .await
        .map_err(store_error)?;

    Ok(Json(json!({ "ok": true })))
}

/// PUT /api/drivers/online-status
///
/// Going offline removes the driver from the presence index synchronously.
/// Going online is a no-op here; the next location heartbeat re-registers
/// the driver with an actual position.
pub async fn online_status_handler(
    Extension(state): Extension<AxumAppState>,
    AuthAccount(driver): AuthAccount,
    Json(body): Json<OnlineStatusBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !body.is_online {
        state
            .deps
            .presence
            .mark_offline(&driver)
            .await
            .map_err(store_error)?;
    }

    Ok(Json(json!({ "ok": true, "is_online": body.is_online })))
}

/// GET /api/drivers/nearby
pub async fn nearby_handler(
    Extension(state): Extension<AxumAppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbyDriver>>, (StatusCode, Json<Value>)> {
    let radius = query
        .radius_km
        .unwrap_or(state.deps.dispatch.search_radius_km);
    let limit = query.limit.unwrap_or(state.deps.dispatch.search_limit);

    let nearby = state
        .deps
        .presence
        .nearest(query.lat, query.lng, radius, limit)
        .await
        .map_err(store_error)?;

    Ok(Json(nearby))
}
