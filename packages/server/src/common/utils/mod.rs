pub mod expo;
pub mod geo;

pub use expo::ExpoClient;
pub use geo::distance_km;
