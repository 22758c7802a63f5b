//! The dispatch core: offering a ride request to one candidate driver at a
//! time until someone accepts or the queue runs dry.
//!
//! All per-request state (status, candidate queue, current offeree, response
//! log) lives in the Redis coordinator with TTLs. Engine transitions are
//! derived from store reads and guarded by a compare-and-set on the
//! current-offeree key, so any worker can handle any event and a crashed
//! worker strands nothing that the sweeper or a TTL cannot resolve.

pub mod admission;
pub mod engine;
pub mod error;
pub mod status;
pub mod store;
pub mod sweeper;
pub mod timer;

pub use admission::{cancel, create_and_dispatch, respond, RespondOutcome};
pub use engine::{DispatchEngine, Verdict};
pub use error::DispatchError;
pub use status::{StatusReader, StatusView};
pub use store::{
    BaseRequestStore, DriverResponse, InMemoryRequestStore, RedisRequestStore, ResponseEntry,
};
pub use timer::OfferTimers;
