//! Typed push messages.
//!
//! Every push the system sends is one of these variants. The `data` payload
//! shape is shared with the mobile apps: the `type` field selects the client
//! handler, the rest is handler-specific.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domains::rides::data::TripData;

/// Settlement currency for driver-initiated payment requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "HBD")]
    Hbd,
    #[serde(rename = "HIVE")]
    Hive,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Hbd => "HBD",
            Currency::Hive => "HIVE",
        }
    }
}

#[derive(Debug, Clone)]
pub enum PushMessage {
    /// Offer to a driver: here is a trip, accept or decline
    RideRequest { trip: TripData },
    /// The driver's acceptance window elapsed without a response
    RideRequestExpired { request_id: Uuid },
    /// A driver accepted the passenger's request
    RideAccepted {
        request_id: Uuid,
        driver: String,
        driver_name: String,
        eta_minutes: u32,
    },
    /// Every candidate declined or timed out
    NoDriversAvailable { request_id: Uuid },
    /// Driver is waiting at the pickup point
    DriverArrived { request_id: Uuid },
    /// Trip underway
    TripStarted { request_id: Uuid },
    /// Trip finished
    TripCompleted {
        request_id: Uuid,
        final_fare: f64,
        completed_at: DateTime<Utc>,
    },
    /// Driver-initiated invoice (out-of-band of dispatch)
    PaymentRequest {
        invoice: String,
        amount: f64,
        currency: Currency,
        payee_account: String,
        driver_name: String,
    },
}

impl PushMessage {
    /// Wire kind, the `type` discriminator the apps switch on
    pub fn kind(&self) -> &'static str {
        match self {
            PushMessage::RideRequest { .. } => "ride_request",
            PushMessage::RideRequestExpired { .. } => "ride_request_expired",
            PushMessage::RideAccepted { .. } => "ride_accepted",
            PushMessage::NoDriversAvailable { .. } => "no_drivers_available",
            PushMessage::DriverArrived { .. } => "driver_arrived",
            PushMessage::TripStarted { .. } => "trip_started",
            PushMessage::TripCompleted { .. } => "trip_completed",
            PushMessage::PaymentRequest { .. } => "payment_request",
        }
    }

    pub fn title(&self) -> String {
        match self {
            PushMessage::RideRequest { .. } => "New ride request".to_string(),
            PushMessage::RideRequestExpired { .. } => "Ride request expired".to_string(),
            PushMessage::RideAccepted { driver_name, .. } => {
                format!("{} accepted your ride", driver_name)
            }
            PushMessage::NoDriversAvailable { .. } => "No drivers available".to_string(),
            PushMessage::DriverArrived { .. } => "Your driver has arrived".to_string(),
            PushMessage::TripStarted { .. } => "Trip started".to_string(),
            PushMessage::TripCompleted { .. } => "Trip completed".to_string(),
            PushMessage::PaymentRequest { driver_name, .. } => {
                format!("Payment request from {}", driver_name)
            }
        }
    }

    pub fn body(&self) -> String {
        match self {
            PushMessage::RideRequest { trip } => format!(
                "Pickup at {} · {:.1} km · {:.3} proposed",
                trip.pickup.address, trip.distance_km, trip.proposed_fare
            ),
            PushMessage::RideRequestExpired { .. } => {
                "The request was offered to another driver".to_string()
            }
            PushMessage::RideAccepted { eta_minutes, .. } => {
                format!("Arriving in about {} min", eta_minutes)
            }
            PushMessage::NoDriversAvailable { .. } => {
                "No nearby drivers could take your ride right now".to_string()
            }
            PushMessage::DriverArrived { .. } => "Meet them at the pickup point".to_string(),
            PushMessage::TripStarted { .. } => "Enjoy the ride".to_string(),
            PushMessage::TripCompleted { final_fare, .. } => {
                format!("Final fare {:.3}", final_fare)
            }
            PushMessage::PaymentRequest {
                amount, currency, ..
            } => format!("{:.3} {}", amount, currency.as_str()),
        }
    }

    /// Handler payload delivered alongside the visible notification
    pub fn data(&self) -> serde_json::Value {
        match self {
            PushMessage::RideRequest { trip } => json!({
                "type": self.kind(),
                "request_id": trip.request_id,
                "trip": trip,
            }),
            PushMessage::RideRequestExpired { request_id } => json!({
                "type": self.kind(),
                "request_id": request_id,
            }),
            PushMessage::RideAccepted {
                request_id,
                driver,
                eta_minutes,
                ..
            } => json!({
                "type": self.kind(),
                "request_id": request_id,
                "driver_id": driver,
                "eta_minutes": eta_minutes,
            }),
            PushMessage::NoDriversAvailable { request_id } => json!({
                "type": self.kind(),
                "request_id": request_id,
            }),
            PushMessage::DriverArrived { request_id } => json!({
                "type": self.kind(),
                "request_id": request_id,
            }),
            PushMessage::TripStarted { request_id } => json!({
                "type": self.kind(),
                "request_id": request_id,
            }),
            PushMessage::TripCompleted {
                request_id,
                final_fare,
                completed_at,
            } => json!({
                "type": self.kind(),
                "request_id": request_id,
                "final_fare": final_fare,
                "completed_at": completed_at,
            }),
            PushMessage::PaymentRequest {
                invoice,
                amount,
                currency,
                payee_account,
                driver_name,
            } => json!({
                "type": self.kind(),
                "invoice": invoice,
                "amount": amount,
                "currency": currency.as_str(),
                "payee_account": payee_account,
                "driver_name": driver_name,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_payload_type() {
        let msg = PushMessage::NoDriversAvailable {
            request_id: Uuid::new_v4(),
        };
        assert_eq!(msg.kind(), "no_drivers_available");
        assert_eq!(msg.data()["type"], "no_drivers_available");
    }

    #[test]
    fn payment_request_carries_currency_code() {
        let msg = PushMessage::PaymentRequest {
            invoice: "inv-1".to_string(),
            amount: 4.5,
            currency: Currency::Hbd,
            payee_account: "driver-bob".to_string(),
            driver_name: "Bob".to_string(),
        };
        assert_eq!(msg.data()["currency"], "HBD");
        assert_eq!(msg.body(), "4.500 HBD");
    }
}
