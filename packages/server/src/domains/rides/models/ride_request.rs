use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::Place;

/// Canonical ride request status.
///
/// The same alphabet is used for the ephemeral dispatch status in Redis;
/// the wire strings below are shared with other implementations, so the
/// `as_str`/`parse` pair is load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Pending,
    Accepted,
    InTransit,
    ArrivedAtPickup,
    Completed,
    Cancelled,
    NoDriversAvailable,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Accepted => "accepted",
            RideStatus::InTransit => "in_transit",
            RideStatus::ArrivedAtPickup => "arrived_at_pickup",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
            RideStatus::NoDriversAvailable => "no_drivers_available",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RideStatus::Pending),
            "accepted" => Some(RideStatus::Accepted),
            "in_transit" => Some(RideStatus::InTransit),
            "arrived_at_pickup" => Some(RideStatus::ArrivedAtPickup),
            "completed" => Some(RideStatus::Completed),
            "cancelled" => Some(RideStatus::Cancelled),
            "no_drivers_available" => Some(RideStatus::NoDriversAvailable),
            _ => None,
        }
    }

    /// Terminal statuses never transition back to `pending`
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RideStatus::Pending)
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RidePriority {
    Normal,
    High,
}

impl RidePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            RidePriority::Normal => "normal",
            RidePriority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(RidePriority::Normal),
            "high" => Some(RidePriority::High),
            _ => None,
        }
    }
}

/// Ride request model - SQL persistence layer
///
/// Canonical state only. The candidate queue, current offeree and response
/// log are ephemeral and live in Redis (see the dispatch domain).
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RideRequest {
    pub id: Uuid,
    pub passenger_account: String,
    pub passenger_name: String,
    pub passenger_phone: String,

    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub pickup_address: String,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub dropoff_address: String,

    pub distance_km: f64,
    pub duration_minutes: i32,
    pub proposed_fare: f64,
    pub priority: String, // "normal" | "high"

    pub status: String, // RideStatus wire string
    pub assigned_driver: Option<String>,
    pub final_fare: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a ride request
#[derive(Debug, Clone, Deserialize)]
pub struct NewRideRequest {
    pub passenger_account: String,
    pub passenger_name: String,
    #[serde(default)]
    pub passenger_phone: String,
    pub pickup: Place,
    pub dropoff: Place,
    pub distance_km: f64,
    pub duration_minutes: i32,
    pub proposed_fare: f64,
    #[serde(default = "default_priority")]
    pub priority: RidePriority,
}

fn default_priority() -> RidePriority {
    RidePriority::Normal
}

impl RideRequest {
    pub fn ride_status(&self) -> RideStatus {
        RideStatus::parse(&self.status).unwrap_or(RideStatus::Pending)
    }

    pub fn pickup(&self) -> Place {
        Place {
            lat: self.pickup_lat,
            lng: self.pickup_lng,
            address: self.pickup_address.clone(),
        }
    }

    pub fn dropoff(&self) -> Place {
        Place {
            lat: self.dropoff_lat,
            lng: self.dropoff_lng,
            address: self.dropoff_address.clone(),
        }
    }

    /// Insert a new pending request
    pub async fn create(input: &NewRideRequest, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO ride_requests (
                passenger_account, passenger_name, passenger_phone,
                pickup_lat, pickup_lng, pickup_address,
                dropoff_lat, dropoff_lng, dropoff_address,
                distance_km, duration_minutes, proposed_fare, priority, status
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'pending')
             RETURNING *",
        )
        .bind(&input.passenger_account)
        .bind(&input.passenger_name)
        .bind(&input.passenger_phone)
        .bind(input.pickup.lat)
        .bind(input.pickup.lng)
        .bind(&input.pickup.address)
        .bind(input.dropoff.lat)
        .bind(input.dropoff.lng)
        .bind(&input.dropoff.address)
        .bind(input.distance_km)
        .bind(input.duration_minutes)
        .bind(input.proposed_fare)
        .bind(input.priority.as_str())
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Find request by ID
    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM ride_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Overwrite canonical status. Idempotent: setting the same status twice
    /// is equivalent to once.
    pub async fn update_status(id: Uuid, status: RideStatus, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE ride_requests SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Record the accepted driver. The WHERE clause keeps assignment
    /// first-writer-wins: a second accept for a different driver is a no-op.
    pub async fn assign_driver(id: Uuid, driver: &str, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE ride_requests
             SET status = 'accepted', assigned_driver = $2
             WHERE id = $1
               AND (assigned_driver IS NULL OR assigned_driver = $2)",
        )
        .bind(id)
        .bind(driver)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Mark the trip completed with its final fare
    pub async fn complete(id: Uuid, final_fare: f64, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "UPDATE ride_requests
             SET status = 'completed', final_fare = $2, completed_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(final_fare)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_strings_round_trip() {
        for status in [
            RideStatus::Pending,
            RideStatus::Accepted,
            RideStatus::InTransit,
            RideStatus::ArrivedAtPickup,
            RideStatus::Completed,
            RideStatus::Cancelled,
            RideStatus::NoDriversAvailable,
        ] {
            assert_eq!(RideStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RideStatus::parse("driving_backwards"), None);
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!RideStatus::Pending.is_terminal());
        assert!(RideStatus::Accepted.is_terminal());
        assert!(RideStatus::Cancelled.is_terminal());
        assert!(RideStatus::NoDriversAvailable.is_terminal());
    }
}
