//! Kernel module - server infrastructure and dependencies.

pub mod coordinator;
pub mod deps;
pub mod test_dependencies;
pub mod traits;

pub use coordinator::Coordinator;
pub use deps::ServerDeps;
pub use test_dependencies::{MockPushService, SentPush, TestDependencies};
pub use traits::*;
