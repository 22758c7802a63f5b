//! Trip lifecycle actions - canonical transitions after acceptance.
//!
//! Dispatch ends at `accepted`; from there the assigned driver walks the
//! trip through arrived → in transit → completed, and may send an
//! out-of-band payment request. These transitions touch only the canonical
//! store and the passenger's push channel.

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domains::notifications::{Currency, NotificationDispatcher, PushMessage};
use crate::domains::rides::{RideRequest, RideStatus};
use crate::kernel::ServerDeps;

#[derive(Debug, Error)]
pub enum TripError {
    #[error("ride request {0} not found")]
    NotFound(Uuid),

    #[error("driver {0} is not assigned to this ride")]
    NotAssignedDriver(String),

    #[error("cannot move a {from} ride to {to}")]
    IllegalTransition { from: RideStatus, to: RideStatus },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// A driver-reported stage of an accepted trip
#[derive(Debug, Clone, Copy)]
pub enum TripStage {
    Arrived,
    Started,
    Completed { final_fare: f64 },
}

impl TripStage {
    fn target(&self) -> RideStatus {
        match self {
            TripStage::Arrived => RideStatus::ArrivedAtPickup,
            TripStage::Started => RideStatus::InTransit,
            TripStage::Completed { .. } => RideStatus::Completed,
        }
    }

    fn legal_from(&self, from: RideStatus) -> bool {
        matches!(
            (from, self),
            (RideStatus::Accepted, TripStage::Arrived)
                | (RideStatus::ArrivedAtPickup, TripStage::Started)
                | (RideStatus::InTransit, TripStage::Completed { .. })
        )
    }
}

/// Advance an accepted trip along arrived → in transit → completed.
/// Only the assigned driver may report progress; transitions outside the
/// chain are rejected.
pub async fn progress_trip(
    deps: &ServerDeps,
    notifier: &NotificationDispatcher,
    request_id: Uuid,
    driver: &str,
    stage: TripStage,
) -> Result<RideRequest, TripError> {
    let ride = deps
        .rides
        .find_by_id(request_id)
        .await?
        .ok_or(TripError::NotFound(request_id))?;

    if ride.assigned_driver.as_deref() != Some(driver) {
        return Err(TripError::NotAssignedDriver(driver.to_string()));
    }

    let from = ride.ride_status();
    if !stage.legal_from(from) {
        return Err(TripError::IllegalTransition {
            from,
            to: stage.target(),
        });
    }

    let (ride, message) = match stage {
        TripStage::Arrived => {
            deps.rides
                .set_status(request_id, RideStatus::ArrivedAtPickup)
                .await?;
            let mut ride = ride;
            ride.status = RideStatus::ArrivedAtPickup.as_str().to_string();
            (ride, PushMessage::DriverArrived { request_id })
        }
        TripStage::Started => {
            deps.rides
                .set_status(request_id, RideStatus::InTransit)
                .await?;
            let mut ride = ride;
            ride.status = RideStatus::InTransit.as_str().to_string();
            (ride, PushMessage::TripStarted { request_id })
        }
        TripStage::Completed { final_fare } => {
            let completed = deps.rides.complete(request_id, final_fare).await?;
            let message = PushMessage::TripCompleted {
                request_id,
                final_fare,
                completed_at: completed.completed_at.unwrap_or_else(chrono::Utc::now),
            };
            (completed, message)
        }
    };

    info!(request_id = %request_id, driver = %driver, status = %stage.target(), "trip progressed");

    if let Err(e) = notifier.send(&ride.passenger_account, message).await {
        warn!(request_id = %request_id, error = %e, "trip progress push failed");
    }

    Ok(ride)
}

/// Driver-initiated payment request, pushed to the passenger
pub async fn request_payment(
    deps: &ServerDeps,
    notifier: &NotificationDispatcher,
    request_id: Uuid,
    driver: &str,
    invoice: String,
    amount: f64,
    currency: Currency,
    payee_account: String,
) -> Result<(), TripError> {
    let ride = deps
        .rides
        .find_by_id(request_id)
        .await?
        .ok_or(TripError::NotFound(request_id))?;

    if ride.assigned_driver.as_deref() != Some(driver) {
        return Err(TripError::NotAssignedDriver(driver.to_string()));
    }

    let driver_name = match deps.users.find_by_account(driver).await {
        Ok(Some(user)) => user.display_name,
        _ => driver.to_string(),
    };

    notifier
        .send(
            &ride.passenger_account,
            PushMessage::PaymentRequest {
                invoice,
                amount,
                currency,
                payee_account,
                driver_name,
            },
        )
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_chain_is_strict() {
        assert!(TripStage::Arrived.legal_from(RideStatus::Accepted));
        assert!(TripStage::Started.legal_from(RideStatus::ArrivedAtPickup));
        assert!(TripStage::Completed { final_fare: 1.0 }.legal_from(RideStatus::InTransit));

        assert!(!TripStage::Started.legal_from(RideStatus::Accepted));
        assert!(!TripStage::Completed { final_fare: 1.0 }.legal_from(RideStatus::Accepted));
        assert!(!TripStage::Arrived.legal_from(RideStatus::Pending));
        assert!(!TripStage::Arrived.legal_from(RideStatus::Completed));
    }
}
