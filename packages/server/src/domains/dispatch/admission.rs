//! Admission API: the entry points route handlers call into the engine.
//!
//! `create_and_dispatch` persists the canonical row and returns immediately;
//! candidate search and the first offer happen in a background task, so the
//! passenger observes `pending` without waiting on the presence index.

use std::sync::Arc;

use tracing::error;
use uuid::Uuid;

use crate::domains::dispatch::engine::{DispatchEngine, Verdict};
use crate::domains::dispatch::error::DispatchError;
use crate::domains::rides::{NewRideRequest, RideRequest};

/// Result of applying a driver verdict.
///
/// `applied = false` carries the request-shaped reason; infrastructure
/// failures surface as `DispatchError::Store` instead.
#[derive(Debug)]
pub struct RespondOutcome {
    pub applied: bool,
    pub reason: Option<&'static str>,
    pub ride: RideRequest,
}

/// Persist a new request and start dispatch in the background
pub async fn create_and_dispatch(
    engine: &Arc<DispatchEngine>,
    input: NewRideRequest,
) -> Result<RideRequest, DispatchError> {
    let deps = engine.deps();

    let ride = deps.rides.create(&input).await?;
    deps.requests
        .init_dispatch(ride.id, deps.dispatch.queue_ttl)
        .await?;
    deps.requests.add_active(ride.id).await?;

    let engine = engine.clone();
    let ride_for_dispatch = ride.clone();
    tokio::spawn(async move {
        dispatch_in_background(engine, ride_for_dispatch).await;
    });

    Ok(ride)
}

async fn dispatch_in_background(engine: Arc<DispatchEngine>, ride: RideRequest) {
    let deps = engine.deps();

    let candidates = match deps
        .presence
        .nearest(
            ride.pickup_lat,
            ride.pickup_lng,
            deps.dispatch.search_radius_km,
            deps.dispatch.search_limit,
        )
        .await
    {
        Ok(nearby) => nearby.into_iter().map(|d| d.account).collect(),
        Err(e) => {
            // Resolve explicitly rather than leaving the passenger hanging
            // until the status TTL lapses.
            error!(request_id = %ride.id, error = %e, "candidate search failed");
            Vec::new()
        }
    };

    if let Err(e) = engine.admit(&ride, candidates).await {
        error!(request_id = %ride.id, error = %e, "dispatch admission failed");
    }
}

/// Apply a driver's accept/decline to a request
pub async fn respond(
    engine: &Arc<DispatchEngine>,
    request_id: Uuid,
    driver: &str,
    verdict: Verdict,
) -> Result<RespondOutcome, DispatchError> {
    let ride = engine
        .deps()
        .rides
        .find_by_id(request_id)
        .await?
        .ok_or(DispatchError::RequestNotFound(request_id))?;

    match engine.respond(&ride, driver, verdict).await {
        Ok(()) => Ok(RespondOutcome {
            applied: true,
            reason: None,
            ride,
        }),
        Err(DispatchError::NotCurrentOfferee { .. }) => Ok(RespondOutcome {
            applied: false,
            reason: Some("not_current_offeree"),
            ride,
        }),
        Err(DispatchError::AlreadyResolved(_)) => Ok(RespondOutcome {
            applied: false,
            reason: Some("already_resolved"),
            ride,
        }),
        Err(e) => Err(e),
    }
}

/// Cancel a request unless it already resolved. Returns whether the cancel
/// was applied.
pub async fn cancel(
    engine: &Arc<DispatchEngine>,
    request_id: Uuid,
) -> Result<bool, DispatchError> {
    match engine.cancel(request_id).await {
        Ok(()) => Ok(true),
        Err(DispatchError::AlreadyResolved(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
