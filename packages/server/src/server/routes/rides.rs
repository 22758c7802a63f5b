//! Ride request endpoints: creation, driver responses, status, trip
//! lifecycle and payment requests.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};
use uuid::Uuid;

use crate::common::Place;
use crate::domains::dispatch::{self, DispatchError, Verdict};
use crate::domains::notifications::Currency;
use crate::domains::rides::actions::{self, TripError, TripStage};
use crate::domains::rides::data::TripData;
use crate::domains::rides::{NewRideRequest, RidePriority, RideRequest};
use crate::server::app::AxumAppState;
use crate::server::auth::AuthAccount;

// =============================================================================
// Request / response bodies
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateRideRequestBody {
    pub passenger_name: String,
    #[serde(default)]
    pub passenger_phone: String,
    pub pickup: Place,
    pub dropoff: Place,
    pub estimated_distance_km: f64,
    pub estimated_duration_minutes: i32,
    pub proposed_fare: f64,
    #[serde(default)]
    pub priority: Option<RidePriority>,
}

#[derive(Debug, Serialize)]
pub struct RideRequestResponse {
    pub id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub trip: TripData,
}

impl From<&RideRequest> for RideRequestResponse {
    fn from(ride: &RideRequest) -> Self {
        Self {
            id: ride.id,
            status: ride.status.clone(),
            created_at: ride.created_at,
            trip: TripData::from(ride),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AcceptBody {
    pub eta_minutes: u32,
}

#[derive(Debug, Deserialize)]
pub struct DeclineBody {
    pub driver_id: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteBody {
    pub final_fare: f64,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequestBody {
    pub invoice: String,
    pub amount: f64,
    pub currency: Currency,
    pub payee_account: String,
}

fn dispatch_error_response(e: DispatchError) -> (StatusCode, Json<Value>) {
    let status = match &e {
        DispatchError::RequestNotFound(_) => StatusCode::NOT_FOUND,
        DispatchError::NotCurrentOfferee { .. } | DispatchError::AlreadyResolved(_) => {
            StatusCode::CONFLICT
        }
        DispatchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("dispatch operation failed: {}", e);
    }
    (status, Json(json!({ "error": e.to_string() })))
}

fn trip_error_response(e: TripError) -> (StatusCode, Json<Value>) {
    let status = match &e {
        TripError::NotFound(_) => StatusCode::NOT_FOUND,
        TripError::NotAssignedDriver(_) => StatusCode::FORBIDDEN,
        TripError::IllegalTransition { .. } => StatusCode::CONFLICT,
        TripError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("trip operation failed: {}", e);
    }
    (status, Json(json!({ "error": e.to_string() })))
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/rides/requests
///
/// Persists the request and returns immediately; dispatch starts in the
/// background.
pub async fn create_request_handler(
    Extension(state): Extension<AxumAppState>,
    AuthAccount(account): AuthAccount,
    Json(body): Json<CreateRideRequestBody>,
) -> Result<(StatusCode, Json<RideRequestResponse>), (StatusCode, Json<Value>)> {
    let input = NewRideRequest {
        passenger_account: account,
        passenger_name: body.passenger_name,
        passenger_phone: body.passenger_phone,
        pickup: body.pickup,
        dropoff: body.dropoff,
        distance_km: body.estimated_distance_km,
        duration_minutes: body.estimated_duration_minutes,
        proposed_fare: body.proposed_fare,
        priority: body.priority.unwrap_or(RidePriority::Normal),
    };

    let ride = dispatch::create_and_dispatch(&state.engine, input)
        .await
        .map_err(dispatch_error_response)?;

    Ok((StatusCode::CREATED, Json(RideRequestResponse::from(&ride))))
}

/// POST /api/rides/requests/:id/accept
pub async fn accept_request_handler(
    Extension(state): Extension<AxumAppState>,
    AuthAccount(driver): AuthAccount,
    Path(id): Path<Uuid>,
    Json(body): Json<AcceptBody>,
) -> Result<Json<TripData>, (StatusCode, Json<Value>)> {
    let outcome = dispatch::respond(
        &state.engine,
        id,
        &driver,
        Verdict::Accept {
            eta_minutes: body.eta_minutes,
        },
    )
    .await
    .map_err(dispatch_error_response)?;

    if !outcome.applied {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({ "applied": false, "reason": outcome.reason })),
        ));
    }

    Ok(Json(TripData::from(&outcome.ride)))
}

/// POST /api/rides/requests/:id/decline
///
/// Unlike accept, the responding driver comes from the request body: a
/// decline may be relayed on a driver's behalf, so the caller identity only
/// gates authentication. The optional reason is logged for diagnostics; the
/// response log records just the decline itself.
pub async fn decline_request_handler(
    Extension(state): Extension<AxumAppState>,
    AuthAccount(_account): AuthAccount,
    Path(id): Path<Uuid>,
    Json(body): Json<DeclineBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(reason) = &body.reason {
        debug!(request_id = %id, driver = %body.driver_id, reason = %reason, "driver declined with reason");
    }

    let outcome = dispatch::respond(&state.engine, id, &body.driver_id, Verdict::Decline)
        .await
        .map_err(dispatch_error_response)?;

    Ok(Json(
        json!({ "applied": outcome.applied, "reason": outcome.reason }),
    ))
}

/// POST /api/rides/requests/:id/cancel
pub async fn cancel_request_handler(
    Extension(state): Extension<AxumAppState>,
    AuthAccount(_account): AuthAccount,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let applied = dispatch::cancel(&state.engine, id)
        .await
        .map_err(dispatch_error_response)?;

    Ok(Json(json!({ "applied": applied })))
}

/// GET /api/rides/requests/:id/status
pub async fn request_status_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<dispatch::StatusView>, (StatusCode, Json<Value>)> {
    let view = state
        .status_reader
        .get_status(id)
        .await
        .map_err(dispatch_error_response)?;

    Ok(Json(view))
}

/// POST /api/rides/requests/:id/arrived
pub async fn arrived_handler(
    Extension(state): Extension<AxumAppState>,
    AuthAccount(driver): AuthAccount,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    progress(&state, id, &driver, TripStage::Arrived).await
}

/// POST /api/rides/requests/:id/start
pub async fn start_trip_handler(
    Extension(state): Extension<AxumAppState>,
    AuthAccount(driver): AuthAccount,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    progress(&state, id, &driver, TripStage::Started).await
}

/// POST /api/rides/requests/:id/complete
pub async fn complete_trip_handler(
    Extension(state): Extension<AxumAppState>,
    AuthAccount(driver): AuthAccount,
    Path(id): Path<Uuid>,
    Json(body): Json<CompleteBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    progress(
        &state,
        id,
        &driver,
        TripStage::Completed {
            final_fare: body.final_fare,
        },
    )
    .await
}

async fn progress(
    state: &AxumAppState,
    id: Uuid,
    driver: &str,
    stage: TripStage,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let ride = actions::progress_trip(&state.deps, &state.notifier, id, driver, stage)
        .await
        .map_err(trip_error_response)?;

    Ok(Json(json!({ "id": ride.id, "status": ride.status })))
}

/// POST /api/rides/requests/:id/payment-request
pub async fn payment_request_handler(
    Extension(state): Extension<AxumAppState>,
    AuthAccount(driver): AuthAccount,
    Path(id): Path<Uuid>,
    Json(body): Json<PaymentRequestBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    actions::request_payment(
        &state.deps,
        &state.notifier,
        id,
        &driver,
        body.invoice,
        body.amount,
        body.currency,
        body.payee_account,
    )
    .await
    .map_err(trip_error_response)?;

    Ok(Json(json!({ "sent": true })))
}
