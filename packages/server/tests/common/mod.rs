//! Shared helpers for engine scenario tests.
//!
//! Scenarios run entirely on in-memory dependencies with the tokio clock
//! paused, so offer timeouts are driven by `tokio::time::advance` and every
//! interleaving is deterministic.

#![allow(dead_code)]

pub mod harness;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ride_core::common::Place;
use ride_core::domains::dispatch::{BaseRequestStore, DispatchEngine};
use ride_core::domains::rides::{BaseRideStore, NewRideRequest, RidePriority, RideRequest};
use ride_core::domains::users::User;
use ride_core::kernel::TestDependencies;

/// Pickup point used by the scenarios (lower Manhattan)
pub const PICKUP: (f64, f64) = (40.7128, -74.0060);

pub struct EngineHarness {
    pub td: TestDependencies,
    pub engine: Arc<DispatchEngine>,
}

impl EngineHarness {
    pub fn new() -> Self {
        let td = TestDependencies::new();
        let engine = DispatchEngine::new(td.deps.clone());
        Self { td, engine }
    }

    /// Register a passenger or driver with a push credential
    pub fn user(&self, account: &str) -> String {
        let token = format!("ExponentPushToken[{}]", account);
        self.td.users.insert(User {
            account: account.to_string(),
            display_name: account.to_string(),
            phone: String::new(),
            expo_push_token: Some(token.clone()),
            role: "driver".to_string(),
            created_at: Utc::now(),
        });
        token
    }

    /// Register a user with no push credential
    pub fn mute_user(&self, account: &str) {
        self.td.users.insert(User {
            account: account.to_string(),
            display_name: account.to_string(),
            phone: String::new(),
            expo_push_token: None,
            role: "driver".to_string(),
            created_at: Utc::now(),
        });
    }

    /// Create a canonical pending request and initialize its dispatch state
    pub async fn admitted_ride(&self, passenger: &str) -> RideRequest {
        let ride = self
            .td
            .rides
            .create(&new_request(passenger))
            .await
            .expect("create ride");
        self.td
            .requests
            .init_dispatch(ride.id, self.td.deps.dispatch.queue_ttl)
            .await
            .expect("init dispatch");
        self.td
            .requests
            .add_active(ride.id)
            .await
            .expect("track active");
        ride
    }

    /// Drivers that received a `ride_request` offer push, in order
    pub fn offered_drivers(&self) -> Vec<String> {
        self.td
            .push
            .sent()
            .into_iter()
            .filter(|p| p.kind() == "ride_request")
            .map(|p| p.token)
            .collect()
    }
}

pub fn new_request(passenger: &str) -> NewRideRequest {
    NewRideRequest {
        passenger_account: passenger.to_string(),
        passenger_name: "Anna".to_string(),
        passenger_phone: "+15551230000".to_string(),
        pickup: Place {
            lat: PICKUP.0,
            lng: PICKUP.1,
            address: "11 Wall St".to_string(),
        },
        dropoff: Place {
            lat: 40.7484,
            lng: -73.9857,
            address: "350 5th Ave".to_string(),
        },
        distance_km: 5.6,
        duration_minutes: 18,
        proposed_fare: 4.25,
        priority: RidePriority::Normal,
    }
}

/// Let spawned tasks (timer fires, background dispatch) run to completion
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused clock and let the resulting timer fires settle
pub async fn advance_and_settle(duration: Duration) {
    tokio::time::advance(duration).await;
    settle().await;
}
