//! Request status projection.
//!
//! Collapses the ephemeral dispatch state and the canonical row into the
//! single view callers poll: `{status, driver_id?, estimated_arrival?}`.
//! The ephemeral status wins while it lives; once its TTL lapses the
//! canonical row answers, and a request nobody ever dispatched reads as
//! `pending`.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domains::dispatch::error::DispatchError;
use crate::domains::dispatch::store::BaseRequestStore;
use crate::domains::rides::store::BaseRideStore;
use crate::domains::rides::RideStatus;

#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub status: RideStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_arrival: Option<u32>,
}

#[derive(Clone)]
pub struct StatusReader {
    requests: Arc<dyn BaseRequestStore>,
    rides: Arc<dyn BaseRideStore>,
}

impl StatusReader {
    pub fn new(requests: Arc<dyn BaseRequestStore>, rides: Arc<dyn BaseRideStore>) -> Self {
        Self { requests, rides }
    }

    pub async fn get_status(&self, request_id: Uuid) -> Result<StatusView, DispatchError> {
        let status = match self.requests.get_status(request_id).await? {
            Some(status) => status,
            None => self
                .rides
                .find_by_id(request_id)
                .await?
                .map(|ride| ride.ride_status())
                .unwrap_or(RideStatus::Pending),
        };

        if status != RideStatus::Accepted {
            return Ok(StatusView {
                status,
                driver_id: None,
                estimated_arrival: None,
            });
        }

        // Assigned driver and ETA only exist for accepted requests. Fall back
        // to the canonical row when the accepted-state keys have expired.
        let mut driver_id = self.requests.get_assigned_driver(request_id).await?;
        if driver_id.is_none() {
            driver_id = self
                .rides
                .find_by_id(request_id)
                .await?
                .and_then(|ride| ride.assigned_driver);
        }
        let estimated_arrival = self.requests.get_eta(request_id).await?;

        Ok(StatusView {
            status,
            driver_id,
            estimated_arrival,
        })
    }
}
