//! Canonical ride store contract.
//!
//! The dispatch engine persists terminal transitions here; route handlers
//! read trip projections. Writes are idempotent (assigning the same driver
//! twice is equivalent to once), which lets callers retry on 5xx.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domains::rides::models::ride_request::{NewRideRequest, RideRequest, RideStatus};

#[async_trait]
pub trait BaseRideStore: Send + Sync {
    async fn create(&self, input: &NewRideRequest) -> Result<RideRequest>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<RideRequest>>;
    async fn set_status(&self, id: Uuid, status: RideStatus) -> Result<()>;
    /// Record the accepted driver; first writer wins, repeats are no-ops
    async fn assign_driver(&self, id: Uuid, driver: &str) -> Result<()>;
    async fn complete(&self, id: Uuid, final_fare: f64) -> Result<RideRequest>;
}

/// Postgres-backed canonical store
pub struct SqlRideStore {
    pool: PgPool,
}

impl SqlRideStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseRideStore for SqlRideStore {
    async fn create(&self, input: &NewRideRequest) -> Result<RideRequest> {
        RideRequest::create(input, &self.pool).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RideRequest>> {
        RideRequest::find_by_id(id, &self.pool).await
    }

    async fn set_status(&self, id: Uuid, status: RideStatus) -> Result<()> {
        RideRequest::update_status(id, status, &self.pool).await
    }

    async fn assign_driver(&self, id: Uuid, driver: &str) -> Result<()> {
        RideRequest::assign_driver(id, driver, &self.pool).await
    }

    async fn complete(&self, id: Uuid, final_fare: f64) -> Result<RideRequest> {
        RideRequest::complete(id, final_fare, &self.pool).await
    }
}

/// In-memory canonical store for tests
#[derive(Default)]
pub struct InMemoryRideStore {
    rides: Mutex<HashMap<Uuid, RideRequest>>,
}

impl InMemoryRideStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRideStore for InMemoryRideStore {
    async fn create(&self, input: &NewRideRequest) -> Result<RideRequest> {
        let request = RideRequest {
            id: Uuid::new_v4(),
            passenger_account: input.passenger_account.clone(),
            passenger_name: input.passenger_name.clone(),
            passenger_phone: input.passenger_phone.clone(),
            pickup_lat: input.pickup.lat,
            pickup_lng: input.pickup.lng,
            pickup_address: input.pickup.address.clone(),
            dropoff_lat: input.dropoff.lat,
            dropoff_lng: input.dropoff.lng,
            dropoff_address: input.dropoff.address.clone(),
            distance_km: input.distance_km,
            duration_minutes: input.duration_minutes,
            proposed_fare: input.proposed_fare,
            priority: input.priority.as_str().to_string(),
            status: RideStatus::Pending.as_str().to_string(),
            assigned_driver: None,
            final_fare: None,
            completed_at: None,
            created_at: Utc::now(),
        };

        self.rides.lock().unwrap().insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RideRequest>> {
        Ok(self.rides.lock().unwrap().get(&id).cloned())
    }

    async fn set_status(&self, id: Uuid, status: RideStatus) -> Result<()> {
        if let Some(ride) = self.rides.lock().unwrap().get_mut(&id) {
            ride.status = status.as_str().to_string();
        }
        Ok(())
    }

    async fn assign_driver(&self, id: Uuid, driver: &str) -> Result<()> {
        if let Some(ride) = self.rides.lock().unwrap().get_mut(&id) {
            match &ride.assigned_driver {
                Some(existing) if existing != driver => {}
                _ => {
                    ride.assigned_driver = Some(driver.to_string());
                    ride.status = RideStatus::Accepted.as_str().to_string();
                }
            }
        }
        Ok(())
    }

    async fn complete(&self, id: Uuid, final_fare: f64) -> Result<RideRequest> {
        let mut rides = self.rides.lock().unwrap();
        let ride = rides
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("ride request {} not found", id))?;
        ride.status = RideStatus::Completed.as_str().to_string();
        ride.final_fare = Some(final_fare);
        ride.completed_at = Some(Utc::now());
        Ok(ride.clone())
    }
}
