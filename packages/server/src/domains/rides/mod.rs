pub mod actions;
pub mod data;
pub mod models;
pub mod store;

pub use models::ride_request::{NewRideRequest, RidePriority, RideRequest, RideStatus};
pub use store::{BaseRideStore, InMemoryRideStore, SqlRideStore};
