// Ride-Hailing Dispatch Server - API Core
//
// This crate provides the backend for matching a passenger's ride request to
// exactly one nearby driver. Candidates are offered the ride one at a time
// with a bounded acceptance window; all per-request dispatch state lives in
// Redis with TTLs so any worker can pick up any event.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::{Config, DispatchConfig};
