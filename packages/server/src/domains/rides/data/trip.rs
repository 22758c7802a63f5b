use serde::Serialize;
use uuid::Uuid;

use crate::domains::rides::models::ride_request::RideRequest;

/// Trip projection - public API representation of a ride request
///
/// This is the payload a driver sees when offered a ride, and what the
/// accept endpoint returns. Shape is shared with the mobile apps.
#[derive(Debug, Clone, Serialize)]
pub struct TripData {
    pub request_id: Uuid,
    pub passenger: TripPassenger,
    pub pickup: TripStop,
    pub dropoff: TripStop,
    pub distance_km: f64,
    pub duration_minutes: i32,
    pub priority: String,
    pub proposed_fare: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripPassenger {
    pub account: String,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripStop {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
    /// Short display label; falls back to the address when no place name exists
    pub name: String,
}

impl From<&RideRequest> for TripData {
    fn from(ride: &RideRequest) -> Self {
        Self {
            request_id: ride.id,
            passenger: TripPassenger {
                account: ride.passenger_account.clone(),
                name: ride.passenger_name.clone(),
                phone: ride.passenger_phone.clone(),
            },
            pickup: TripStop {
                lat: ride.pickup_lat,
                lng: ride.pickup_lng,
                address: ride.pickup_address.clone(),
                name: ride.pickup_address.clone(),
            },
            dropoff: TripStop {
                lat: ride.dropoff_lat,
                lng: ride.dropoff_lng,
                address: ride.dropoff_address.clone(),
                name: ride.dropoff_address.clone(),
            },
            distance_km: ride.distance_km,
            duration_minutes: ride.duration_minutes,
            priority: ride.priority.clone(),
            proposed_fare: ride.proposed_fare,
        }
    }
}
