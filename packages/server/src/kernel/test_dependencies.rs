// TestDependencies - mock implementations for testing
//
// Provides a push-transport spy and a fully in-memory ServerDeps wiring so
// engine scenarios run without Postgres or Redis.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::config::DispatchConfig;
use crate::domains::dispatch::store::InMemoryRequestStore;
use crate::domains::drivers::presence::InMemoryPresenceIndex;
use crate::domains::rides::store::InMemoryRideStore;
use crate::domains::users::store::InMemoryUserStore;
use crate::kernel::deps::ServerDeps;
use crate::kernel::traits::BasePushNotificationService;

// =============================================================================
// Mock Push Service (spy)
// =============================================================================

/// One recorded push delivery
#[derive(Debug, Clone)]
pub struct SentPush {
    pub token: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

impl SentPush {
    /// The `type` discriminator of the payload
    pub fn kind(&self) -> &str {
        self.data.get("type").and_then(|t| t.as_str()).unwrap_or("")
    }
}

/// Spy push service that records all deliveries
pub struct MockPushService {
    sent: Mutex<Vec<SentPush>>,
    fail: bool,
}

impl MockPushService {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A transport that refuses every delivery
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// All recorded deliveries
    pub fn sent(&self) -> Vec<SentPush> {
        self.sent.lock().unwrap().clone()
    }

    /// Deliveries of a given kind to a given token
    pub fn sent_to(&self, token: &str, kind: &str) -> Vec<SentPush> {
        self.sent()
            .into_iter()
            .filter(|p| p.token == token && p.kind() == kind)
            .collect()
    }
}

impl Default for MockPushService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BasePushNotificationService for MockPushService {
    async fn send_notification(
        &self,
        push_token: &str,
        title: &str,
        body: &str,
        data: serde_json::Value,
    ) -> Result<()> {
        if self.fail {
            anyhow::bail!("push transport refused delivery");
        }
        self.sent.lock().unwrap().push(SentPush {
            token: push_token.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            data,
        });
        Ok(())
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// In-memory ServerDeps plus handles to the concrete doubles, so tests can
/// seed users, move drivers and inspect recorded pushes.
pub struct TestDependencies {
    pub deps: Arc<ServerDeps>,
    pub rides: Arc<InMemoryRideStore>,
    pub users: Arc<InMemoryUserStore>,
    pub requests: Arc<InMemoryRequestStore>,
    pub presence: Arc<InMemoryPresenceIndex>,
    pub push: Arc<MockPushService>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    pub fn with_config(dispatch: DispatchConfig) -> Self {
        let rides = Arc::new(InMemoryRideStore::new());
        let users = Arc::new(InMemoryUserStore::new());
        let requests = Arc::new(InMemoryRequestStore::new());
        let presence = Arc::new(InMemoryPresenceIndex::new(dispatch.liveness_ttl));
        let push = Arc::new(MockPushService::new());

        let deps = Arc::new(ServerDeps::new(
            rides.clone(),
            users.clone(),
            requests.clone(),
            presence.clone(),
            push.clone(),
            dispatch,
        ));

        Self {
            deps,
            rides,
            users,
            requests,
            presence,
            push,
        }
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
