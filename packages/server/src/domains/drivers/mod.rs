pub mod presence;

pub use presence::{BasePresenceIndex, InMemoryPresenceIndex, NearbyDriver, RedisPresenceIndex};
