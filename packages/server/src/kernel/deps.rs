//! Server dependencies for domain actions (using traits for testability)
//!
//! This module provides the central dependency container used by the
//! dispatch engine and route handlers. All external services sit behind
//! trait abstractions: one production implementation, one in-memory
//! implementation per trait.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::DispatchConfig;
use crate::domains::dispatch::store::{BaseRequestStore, RedisRequestStore};
use crate::domains::drivers::presence::{BasePresenceIndex, RedisPresenceIndex};
use crate::domains::rides::store::{BaseRideStore, SqlRideStore};
use crate::domains::users::store::{BaseUserStore, SqlUserStore};
use crate::kernel::coordinator::Coordinator;
use crate::kernel::traits::BasePushNotificationService;

/// Server dependencies accessible to domain code
#[derive(Clone)]
pub struct ServerDeps {
    /// Canonical ride store (Postgres in production)
    pub rides: Arc<dyn BaseRideStore>,
    /// User store: display names, phone numbers, push credentials
    pub users: Arc<dyn BaseUserStore>,
    /// Ephemeral per-request dispatch state (Redis in production)
    pub requests: Arc<dyn BaseRequestStore>,
    /// Driver presence index (geo + liveness)
    pub presence: Arc<dyn BasePresenceIndex>,
    /// Push transport
    pub push: Arc<dyn BasePushNotificationService>,
    /// Dispatch tunables
    pub dispatch: DispatchConfig,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    pub fn new(
        rides: Arc<dyn BaseRideStore>,
        users: Arc<dyn BaseUserStore>,
        requests: Arc<dyn BaseRequestStore>,
        presence: Arc<dyn BasePresenceIndex>,
        push: Arc<dyn BasePushNotificationService>,
        dispatch: DispatchConfig,
    ) -> Self {
        Self {
            rides,
            users,
            requests,
            presence,
            push,
            dispatch,
        }
    }

    /// Production wiring: Postgres canonical stores, Redis coordinator
    pub fn production(
        pool: PgPool,
        coordinator: Coordinator,
        push: Arc<dyn BasePushNotificationService>,
        dispatch: DispatchConfig,
    ) -> Self {
        Self {
            rides: Arc::new(SqlRideStore::new(pool.clone())),
            users: Arc::new(SqlUserStore::new(pool)),
            requests: Arc::new(RedisRequestStore::new(coordinator.clone())),
            presence: Arc::new(RedisPresenceIndex::new(coordinator, dispatch.liveness_ttl)),
            push,
            dispatch,
        }
    }
}
