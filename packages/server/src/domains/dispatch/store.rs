//! Per-request dispatch state over the key-value coordinator.
//!
//! Key layout (shared with other implementations, do not rename):
//!
//! ```text
//! ride:request:{id}:status          string   600 s pending / 3600 s accepted
//! ride:request:{id}:queue           list     600 s   candidate queue, head = next
//! ride:request:{id}:current_driver  string   120 s   current offeree
//! ride:request:{id}:driver          string   3600 s  accepted driver
//! ride:request:{id}:eta             string   3600 s  accepted ETA (minutes)
//! ride:request:{id}:responses       list     86400 s append-only response log
//! ride:request:{id}:last_offer      string   600 s   most recently offered driver
//! ride:dispatch:active              set      -       requests with live dispatch
//! ```
//!
//! The offeree write is the one concurrency primitive in the system: it is a
//! compare-and-set, so two workers racing two drivers onto the same request
//! resolve to exactly one winner.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domains::rides::RideStatus;
use crate::kernel::coordinator::Coordinator;

/// A driver's recorded reaction to an offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverResponse {
    Accept,
    Decline,
    Timeout,
}

/// One entry in the append-only response log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub driver_id: String,
    pub response: DriverResponse,
    pub at: DateTime<Utc>,
}

impl ResponseEntry {
    pub fn now(driver_id: impl Into<String>, response: DriverResponse) -> Self {
        Self {
            driver_id: driver_id.into(),
            response,
            at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait BaseRequestStore: Send + Sync {
    /// Atomically mark a request as entering dispatch (`pending`)
    async fn init_dispatch(&self, request_id: Uuid, ttl: Duration) -> Result<()>;

    async fn set_status(&self, request_id: Uuid, status: RideStatus, ttl: Duration) -> Result<()>;

    /// Ephemeral status; `None` when the keys have expired or never existed
    async fn get_status(&self, request_id: Uuid) -> Result<Option<RideStatus>>;

    /// Compare-and-set the current offeree. Succeeds when the key is empty
    /// or holds `expected_prev`. Returns whether the write happened.
    async fn set_current_offeree(
        &self,
        request_id: Uuid,
        driver: &str,
        expected_prev: Option<&str>,
        ttl: Duration,
    ) -> Result<bool>;

    async fn get_current_offeree(&self, request_id: Uuid) -> Result<Option<String>>;

    /// Atomically clear the offeree key if it still names `driver`.
    /// Returns whether this caller won the take.
    async fn take_current_offeree(&self, request_id: Uuid, driver: &str) -> Result<bool>;

    async fn clear_current_offeree(&self, request_id: Uuid) -> Result<()>;

    async fn set_assigned_driver(
        &self,
        request_id: Uuid,
        driver: &str,
        ttl: Duration,
    ) -> Result<()>;

    async fn get_assigned_driver(&self, request_id: Uuid) -> Result<Option<String>>;

    async fn set_eta(&self, request_id: Uuid, minutes: u32, ttl: Duration) -> Result<()>;

    async fn get_eta(&self, request_id: Uuid) -> Result<Option<u32>>;

    async fn append_response(
        &self,
        request_id: Uuid,
        entry: &ResponseEntry,
        ttl: Duration,
    ) -> Result<()>;

    async fn responses(&self, request_id: Uuid) -> Result<Vec<ResponseEntry>>;

    /// Seed the candidate queue (ascending-distance order preserved).
    /// Returns the queue length.
    async fn seed_queue(&self, request_id: Uuid, drivers: &[String], ttl: Duration)
        -> Result<usize>;

    /// Atomic single-reader pop of the next candidate
    async fn pop_next(&self, request_id: Uuid) -> Result<Option<String>>;

    async fn drop_queue(&self, request_id: Uuid) -> Result<()>;

    /// Marker for the sweeper: who held the most recent offer
    async fn set_last_offer(&self, request_id: Uuid, driver: &str, ttl: Duration) -> Result<()>;

    async fn last_offer(&self, request_id: Uuid) -> Result<Option<String>>;

    async fn add_active(&self, request_id: Uuid) -> Result<()>;

    async fn remove_active(&self, request_id: Uuid) -> Result<()>;

    async fn active_requests(&self) -> Result<Vec<Uuid>>;

    /// Remove queue, offeree and last-offer keys on resolution
    async fn delete_dispatch_ephemera(&self, request_id: Uuid) -> Result<()>;
}

// =============================================================================
// Redis implementation
// =============================================================================

const ACTIVE_SET: &str = "ride:dispatch:active";

/// CAS on the offeree key: set only if the key is empty or holds the
/// expected previous value. Runs server-side so the read-compare-write is
/// atomic across workers.
const OFFEREE_CAS_SCRIPT: &str = r#"
local cur = redis.call('GET', KEYS[1])
if (not cur) or cur == ARGV[2] then
  redis.call('SET', KEYS[1], ARGV[1], 'EX', tonumber(ARGV[3]))
  return 1
end
return 0
"#;

/// Delete the offeree key only if it still names the given driver
const OFFEREE_TAKE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  redis.call('DEL', KEYS[1])
  return 1
end
return 0
"#;

pub struct RedisRequestStore {
    coordinator: Coordinator,
    cas: redis::Script,
    take: redis::Script,
}

impl RedisRequestStore {
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            coordinator,
            cas: redis::Script::new(OFFEREE_CAS_SCRIPT),
            take: redis::Script::new(OFFEREE_TAKE_SCRIPT),
        }
    }

    fn key(request_id: Uuid, suffix: &str) -> String {
        format!("ride:request:{}:{}", request_id, suffix)
    }
}

#[async_trait]
impl BaseRequestStore for RedisRequestStore {
    async fn init_dispatch(&self, request_id: Uuid, ttl: Duration) -> Result<()> {
        self.set_status(request_id, RideStatus::Pending, ttl).await
    }

    async fn set_status(&self, request_id: Uuid, status: RideStatus, ttl: Duration) -> Result<()> {
        let mut conn = self.coordinator.connection();
        let _: () = conn
            .set_ex(
                Self::key(request_id, "status"),
                status.as_str(),
                ttl.as_secs(),
            )
            .await
            .context("failed to write dispatch status")?;
        Ok(())
    }

    async fn get_status(&self, request_id: Uuid) -> Result<Option<RideStatus>> {
        let mut conn = self.coordinator.connection();
        let raw: Option<String> = conn
            .get(Self::key(request_id, "status"))
            .await
            .context("failed to read dispatch status")?;
        Ok(raw.and_then(|s| RideStatus::parse(&s)))
    }

    async fn set_current_offeree(
        &self,
        request_id: Uuid,
        driver: &str,
        expected_prev: Option<&str>,
        ttl: Duration,
    ) -> Result<bool> {
        let mut conn = self.coordinator.connection();
        let won: i64 = self
            .cas
            .key(Self::key(request_id, "current_driver"))
            .arg(driver)
            .arg(expected_prev.unwrap_or(""))
            .arg(ttl.as_secs())
            .invoke_async(&mut conn)
            .await
            .context("offeree CAS failed")?;
        Ok(won == 1)
    }

    async fn get_current_offeree(&self, request_id: Uuid) -> Result<Option<String>> {
        let mut conn = self.coordinator.connection();
        conn.get(Self::key(request_id, "current_driver"))
            .await
            .context("failed to read current offeree")
    }

    async fn take_current_offeree(&self, request_id: Uuid, driver: &str) -> Result<bool> {
        let mut conn = self.coordinator.connection();
        let won: i64 = self
            .take
            .key(Self::key(request_id, "current_driver"))
            .arg(driver)
            .invoke_async(&mut conn)
            .await
            .context("offeree take failed")?;
        Ok(won == 1)
    }

    async fn clear_current_offeree(&self, request_id: Uuid) -> Result<()> {
        let mut conn = self.coordinator.connection();
        let _: () = conn
            .del(Self::key(request_id, "current_driver"))
            .await
            .context("failed to clear current offeree")?;
        Ok(())
    }

    async fn set_assigned_driver(
        &self,
        request_id: Uuid,
        driver: &str,
        ttl: Duration,
    ) -> Result<()> {
        let mut conn = self.coordinator.connection();
        let _: () = conn
            .set_ex(Self::key(request_id, "driver"), driver, ttl.as_secs())
            .await
            .context("failed to write assigned driver")?;
        Ok(())
    }

    async fn get_assigned_driver(&self, request_id: Uuid) -> Result<Option<String>> {
        let mut conn = self.coordinator.connection();
        conn.get(Self::key(request_id, "driver"))
            .await
            .context("failed to read assigned driver")
    }

    async fn set_eta(&self, request_id: Uuid, minutes: u32, ttl: Duration) -> Result<()> {
        let mut conn = self.coordinator.connection();
        let _: () = conn
            .set_ex(Self::key(request_id, "eta"), minutes, ttl.as_secs())
            .await
            .context("failed to write ETA")?;
        Ok(())
    }

    async fn get_eta(&self, request_id: Uuid) -> Result<Option<u32>> {
        let mut conn = self.coordinator.connection();
        conn.get(Self::key(request_id, "eta"))
            .await
            .context("failed to read ETA")
    }

    async fn append_response(
        &self,
        request_id: Uuid,
        entry: &ResponseEntry,
        ttl: Duration,
    ) -> Result<()> {
        let key = Self::key(request_id, "responses");
        let json = serde_json::to_string(entry).context("failed to serialize response entry")?;

        let mut conn = self.coordinator.connection();
        let _: () = conn
            .rpush(&key, json)
            .await
            .context("failed to append response entry")?;
        let _: () = conn
            .expire(&key, ttl.as_secs() as i64)
            .await
            .context("failed to refresh response log TTL")?;
        Ok(())
    }

    async fn responses(&self, request_id: Uuid) -> Result<Vec<ResponseEntry>> {
        let mut conn = self.coordinator.connection();
        let raw: Vec<String> = conn
            .lrange(Self::key(request_id, "responses"), 0, -1)
            .await
            .context("failed to read response log")?;

        raw.iter()
            .map(|json| {
                serde_json::from_str(json).context("failed to deserialize response entry")
            })
            .collect()
    }

    async fn seed_queue(
        &self,
        request_id: Uuid,
        drivers: &[String],
        ttl: Duration,
    ) -> Result<usize> {
        if drivers.is_empty() {
            return Ok(0);
        }

        let key = Self::key(request_id, "queue");
        let mut conn = self.coordinator.connection();
        let len: usize = conn
            .rpush(&key, drivers)
            .await
            .context("failed to seed candidate queue")?;
        let _: () = conn
            .expire(&key, ttl.as_secs() as i64)
            .await
            .context("failed to set candidate queue TTL")?;
        Ok(len)
    }

    async fn pop_next(&self, request_id: Uuid) -> Result<Option<String>> {
        let mut conn = self.coordinator.connection();
        conn.lpop(Self::key(request_id, "queue"), None)
            .await
            .context("failed to pop next candidate")
    }

    async fn drop_queue(&self, request_id: Uuid) -> Result<()> {
        let mut conn = self.coordinator.connection();
        let _: () = conn
            .del(Self::key(request_id, "queue"))
            .await
            .context("failed to drop candidate queue")?;
        Ok(())
    }

    async fn set_last_offer(&self, request_id: Uuid, driver: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.coordinator.connection();
        let _: () = conn
            .set_ex(Self::key(request_id, "last_offer"), driver, ttl.as_secs())
            .await
            .context("failed to write last-offer marker")?;
        Ok(())
    }

    async fn last_offer(&self, request_id: Uuid) -> Result<Option<String>> {
        let mut conn = self.coordinator.connection();
        conn.get(Self::key(request_id, "last_offer"))
            .await
            .context("failed to read last-offer marker")
    }

    async fn add_active(&self, request_id: Uuid) -> Result<()> {
        let mut conn = self.coordinator.connection();
        let _: () = conn
            .sadd(ACTIVE_SET, request_id.to_string())
            .await
            .context("failed to add to active set")?;
        Ok(())
    }

    async fn remove_active(&self, request_id: Uuid) -> Result<()> {
        let mut conn = self.coordinator.connection();
        let _: () = conn
            .srem(ACTIVE_SET, request_id.to_string())
            .await
            .context("failed to remove from active set")?;
        Ok(())
    }

    async fn active_requests(&self) -> Result<Vec<Uuid>> {
        let mut conn = self.coordinator.connection();
        let members: Vec<String> = conn
            .smembers(ACTIVE_SET)
            .await
            .context("failed to read active set")?;
        Ok(members
            .iter()
            .filter_map(|m| Uuid::parse_str(m).ok())
            .collect())
    }

    async fn delete_dispatch_ephemera(&self, request_id: Uuid) -> Result<()> {
        let keys = vec![
            Self::key(request_id, "queue"),
            Self::key(request_id, "current_driver"),
            Self::key(request_id, "last_offer"),
        ];
        let mut conn = self.coordinator.connection();
        let _: () = conn
            .del(keys)
            .await
            .context("failed to delete dispatch ephemera")?;
        Ok(())
    }
}

// =============================================================================
// In-memory implementation (tests, single-process deployments)
// =============================================================================

struct Expiring<T> {
    value: T,
    expires_at: tokio::time::Instant,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: tokio::time::Instant::now() + ttl,
        }
    }

    fn fresh(&self) -> bool {
        tokio::time::Instant::now() < self.expires_at
    }
}

#[derive(Default)]
struct Inner {
    status: HashMap<Uuid, Expiring<RideStatus>>,
    offeree: HashMap<Uuid, Expiring<String>>,
    assigned: HashMap<Uuid, Expiring<String>>,
    eta: HashMap<Uuid, Expiring<u32>>,
    last_offer: HashMap<Uuid, Expiring<String>>,
    queue: HashMap<Uuid, Expiring<VecDeque<String>>>,
    responses: HashMap<Uuid, Expiring<Vec<ResponseEntry>>>,
    active: HashSet<Uuid>,
}

/// In-memory request store with real TTL semantics (driven by the tokio
/// clock, so paused-time tests can expire keys deterministically).
#[derive(Default)]
pub struct InMemoryRequestStore {
    inner: Mutex<Inner>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_get<T: Clone>(map: &HashMap<Uuid, Expiring<T>>, id: &Uuid) -> Option<T> {
        map.get(id).filter(|e| e.fresh()).map(|e| e.value.clone())
    }

    /// Test hook: force-expire the offeree key, as Redis would after 120 s
    pub fn expire_current_offeree(&self, request_id: Uuid) {
        self.inner.lock().unwrap().offeree.remove(&request_id);
    }
}

#[async_trait]
impl BaseRequestStore for InMemoryRequestStore {
    async fn init_dispatch(&self, request_id: Uuid, ttl: Duration) -> Result<()> {
        self.set_status(request_id, RideStatus::Pending, ttl).await
    }

    async fn set_status(&self, request_id: Uuid, status: RideStatus, ttl: Duration) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .status
            .insert(request_id, Expiring::new(status, ttl));
        Ok(())
    }

    async fn get_status(&self, request_id: Uuid) -> Result<Option<RideStatus>> {
        Ok(Self::fresh_get(
            &self.inner.lock().unwrap().status,
            &request_id,
        ))
    }

    async fn set_current_offeree(
        &self,
        request_id: Uuid,
        driver: &str,
        expected_prev: Option<&str>,
        ttl: Duration,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let current = Self::fresh_get(&inner.offeree, &request_id);

        // An empty key always accepts the set; an occupied key only hands
        // over to a caller that knows the current value.
        let matches = match current.as_deref() {
            None => true,
            Some(cur) => expected_prev == Some(cur),
        };

        if matches {
            inner
                .offeree
                .insert(request_id, Expiring::new(driver.to_string(), ttl));
        }
        Ok(matches)
    }

    async fn get_current_offeree(&self, request_id: Uuid) -> Result<Option<String>> {
        Ok(Self::fresh_get(
            &self.inner.lock().unwrap().offeree,
            &request_id,
        ))
    }

    async fn take_current_offeree(&self, request_id: Uuid, driver: &str) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let won = Self::fresh_get(&inner.offeree, &request_id).as_deref() == Some(driver);
        if won {
            inner.offeree.remove(&request_id);
        }
        Ok(won)
    }

    async fn clear_current_offeree(&self, request_id: Uuid) -> Result<()> {
        self.inner.lock().unwrap().offeree.remove(&request_id);
        Ok(())
    }

    async fn set_assigned_driver(
        &self,
        request_id: Uuid,
        driver: &str,
        ttl: Duration,
    ) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .assigned
            .insert(request_id, Expiring::new(driver.to_string(), ttl));
        Ok(())
    }

    async fn get_assigned_driver(&self, request_id: Uuid) -> Result<Option<String>> {
        Ok(Self::fresh_get(
            &self.inner.lock().unwrap().assigned,
            &request_id,
        ))
    }

    async fn set_eta(&self, request_id: Uuid, minutes: u32, ttl: Duration) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .eta
            .insert(request_id, Expiring::new(minutes, ttl));
        Ok(())
    }

    async fn get_eta(&self, request_id: Uuid) -> Result<Option<u32>> {
        Ok(Self::fresh_get(&self.inner.lock().unwrap().eta, &request_id))
    }

    async fn append_response(
        &self,
        request_id: Uuid,
        entry: &ResponseEntry,
        ttl: Duration,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let log = match inner.responses.remove(&request_id) {
            Some(existing) if existing.fresh() => {
                let mut log = existing.value;
                log.push(entry.clone());
                log
            }
            _ => vec![entry.clone()],
        };
        inner.responses.insert(request_id, Expiring::new(log, ttl));
        Ok(())
    }

    async fn responses(&self, request_id: Uuid) -> Result<Vec<ResponseEntry>> {
        Ok(
            Self::fresh_get(&self.inner.lock().unwrap().responses, &request_id)
                .unwrap_or_default(),
        )
    }

    async fn seed_queue(
        &self,
        request_id: Uuid,
        drivers: &[String],
        ttl: Duration,
    ) -> Result<usize> {
        if drivers.is_empty() {
            return Ok(0);
        }
        let queue: VecDeque<String> = drivers.iter().cloned().collect();
        let len = queue.len();
        self.inner
            .lock()
            .unwrap()
            .queue
            .insert(request_id, Expiring::new(queue, ttl));
        Ok(len)
    }

    async fn pop_next(&self, request_id: Uuid) -> Result<Option<String>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.queue.get_mut(&request_id) {
            Some(entry) if entry.fresh() => Ok(entry.value.pop_front()),
            _ => Ok(None),
        }
    }

    async fn drop_queue(&self, request_id: Uuid) -> Result<()> {
        self.inner.lock().unwrap().queue.remove(&request_id);
        Ok(())
    }

    async fn set_last_offer(&self, request_id: Uuid, driver: &str, ttl: Duration) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .last_offer
            .insert(request_id, Expiring::new(driver.to_string(), ttl));
        Ok(())
    }

    async fn last_offer(&self, request_id: Uuid) -> Result<Option<String>> {
        Ok(Self::fresh_get(
            &self.inner.lock().unwrap().last_offer,
            &request_id,
        ))
    }

    async fn add_active(&self, request_id: Uuid) -> Result<()> {
        self.inner.lock().unwrap().active.insert(request_id);
        Ok(())
    }

    async fn remove_active(&self, request_id: Uuid) -> Result<()> {
        self.inner.lock().unwrap().active.remove(&request_id);
        Ok(())
    }

    async fn active_requests(&self) -> Result<Vec<Uuid>> {
        Ok(self.inner.lock().unwrap().active.iter().copied().collect())
    }

    async fn delete_dispatch_ephemera(&self, request_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.queue.remove(&request_id);
        inner.offeree.remove(&request_id);
        inner.last_offer.remove(&request_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryRequestStore {
        InMemoryRequestStore::new()
    }

    const TTL: Duration = Duration::from_secs(600);

    #[tokio::test]
    async fn offeree_cas_requires_expected_value() {
        let s = store();
        let id = Uuid::new_v4();

        // Empty key: only the expected-empty CAS wins
        assert!(s.set_current_offeree(id, "d1", None, TTL).await.unwrap());
        // Occupied: expected-empty loses
        assert!(!s.set_current_offeree(id, "d2", None, TTL).await.unwrap());
        // Occupied: correct expected value wins
        assert!(s
            .set_current_offeree(id, "d2", Some("d1"), TTL)
            .await
            .unwrap());
        assert_eq!(
            s.get_current_offeree(id).await.unwrap().as_deref(),
            Some("d2")
        );
    }

    #[tokio::test]
    async fn take_offeree_is_single_winner() {
        let s = store();
        let id = Uuid::new_v4();
        s.set_current_offeree(id, "d1", None, TTL).await.unwrap();

        assert!(s.take_current_offeree(id, "d1").await.unwrap());
        assert!(!s.take_current_offeree(id, "d1").await.unwrap());
        assert_eq!(s.get_current_offeree(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn take_offeree_rejects_wrong_driver() {
        let s = store();
        let id = Uuid::new_v4();
        s.set_current_offeree(id, "d1", None, TTL).await.unwrap();

        assert!(!s.take_current_offeree(id, "d2").await.unwrap());
        assert_eq!(
            s.get_current_offeree(id).await.unwrap().as_deref(),
            Some("d1")
        );
    }

    #[tokio::test]
    async fn queue_pops_in_seed_order() {
        let s = store();
        let id = Uuid::new_v4();
        let seeded = s
            .seed_queue(
                id,
                &["d1".to_string(), "d2".to_string(), "d3".to_string()],
                TTL,
            )
            .await
            .unwrap();
        assert_eq!(seeded, 3);

        assert_eq!(s.pop_next(id).await.unwrap().as_deref(), Some("d1"));
        assert_eq!(s.pop_next(id).await.unwrap().as_deref(), Some("d2"));
        assert_eq!(s.pop_next(id).await.unwrap().as_deref(), Some("d3"));
        assert_eq!(s.pop_next(id).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_keys_read_as_absent() {
        let s = store();
        let id = Uuid::new_v4();

        s.init_dispatch(id, Duration::from_secs(600)).await.unwrap();
        s.set_current_offeree(id, "d1", None, Duration::from_secs(120))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(121)).await;
        assert_eq!(s.get_current_offeree(id).await.unwrap(), None);
        // Status (600 s) is still fresh
        assert_eq!(
            s.get_status(id).await.unwrap(),
            Some(RideStatus::Pending)
        );

        tokio::time::advance(Duration::from_secs(480)).await;
        assert_eq!(s.get_status(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn response_log_appends_in_order() {
        let s = store();
        let id = Uuid::new_v4();

        s.append_response(id, &ResponseEntry::now("d1", DriverResponse::Timeout), TTL)
            .await
            .unwrap();
        s.append_response(id, &ResponseEntry::now("d2", DriverResponse::Decline), TTL)
            .await
            .unwrap();
        s.append_response(id, &ResponseEntry::now("d3", DriverResponse::Accept), TTL)
            .await
            .unwrap();

        let log = s.responses(id).await.unwrap();
        let drivers: Vec<_> = log.iter().map(|e| e.driver_id.as_str()).collect();
        assert_eq!(drivers, vec!["d1", "d2", "d3"]);
        assert_eq!(log[2].response, DriverResponse::Accept);
    }
}
