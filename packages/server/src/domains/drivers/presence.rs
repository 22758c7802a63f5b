//! Driver presence index.
//!
//! Records driver position and liveness, and answers "k nearest online
//! drivers within radius r of a point". Queried both by the public
//! nearby-drivers endpoint and by candidate selection during dispatch.
//!
//! Liveness is swept at query time: entries whose last heartbeat is older
//! than the liveness window are removed from the index as a side effect of
//! `nearest`, so the set is self-cleaning without a separate reaper. A
//! driver heartbeating at the exact pruning moment may be removed and
//! re-added by its next heartbeat; callers tolerate a missed candidate slot.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use redis::geo::{RadiusOptions, RadiusSearchResult, Unit};
use redis::AsyncCommands;
use tracing::debug;

use crate::common::utils::geo::distance_km;
use crate::common::GeoPoint;
use crate::kernel::coordinator::Coordinator;

/// Geo set holding members `driver:{account}` with their last position
const GEO_SET: &str = "drivers:online";

/// An online driver with its distance from the query point
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NearbyDriver {
    pub account: String,
    pub distance_km: f64,
}

#[async_trait]
pub trait BasePresenceIndex: Send + Sync {
    /// Upsert position and last-seen for a driver
    async fn heartbeat(&self, driver: &str, lat: f64, lng: f64) -> Result<()>;

    /// Remove a driver from the index synchronously
    async fn mark_offline(&self, driver: &str) -> Result<()>;

    /// Nearest live drivers, ascending great-circle distance, at most `limit`.
    /// Stale entries encountered along the way are pruned from the index.
    async fn nearest(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<NearbyDriver>>;
}

// =============================================================================
// Redis implementation
// =============================================================================

/// Presence index over the Redis coordinator: a geo set for positions plus
/// a TTL'd `driver:last_seen:{account}` key per driver for liveness.
pub struct RedisPresenceIndex {
    coordinator: Coordinator,
    liveness_ttl: Duration,
}

impl RedisPresenceIndex {
    pub fn new(coordinator: Coordinator, liveness_ttl: Duration) -> Self {
        Self {
            coordinator,
            liveness_ttl,
        }
    }

    fn member(driver: &str) -> String {
        format!("driver:{}", driver)
    }

    fn last_seen_key(driver: &str) -> String {
        format!("driver:last_seen:{}", driver)
    }
}

#[async_trait]
impl BasePresenceIndex for RedisPresenceIndex {
    async fn heartbeat(&self, driver: &str, lat: f64, lng: f64) -> Result<()> {
        let mut conn = self.coordinator.connection();

        let _: () = conn
            .geo_add(GEO_SET, (lng, lat, Self::member(driver)))
            .await
            .context("GEOADD failed")?;

        let _: () = conn
            .set_ex(
                Self::last_seen_key(driver),
                Utc::now().timestamp_millis(),
                self.liveness_ttl.as_secs(),
            )
            .await
            .context("failed to record driver last-seen")?;

        Ok(())
    }

    async fn mark_offline(&self, driver: &str) -> Result<()> {
        let mut conn = self.coordinator.connection();

        let _: () = conn
            .zrem(GEO_SET, Self::member(driver))
            .await
            .context("failed to remove driver from geo set")?;
        let _: () = conn
            .del(Self::last_seen_key(driver))
            .await
            .context("failed to delete driver last-seen")?;

        Ok(())
    }

    async fn nearest(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<NearbyDriver>> {
        let mut conn = self.coordinator.connection();

        let results: Vec<RadiusSearchResult> = conn
            .geo_radius(
                GEO_SET,
                lng,
                lat,
                radius_km,
                Unit::Kilometers,
                RadiusOptions::default().with_dist(),
            )
            .await
            .context("GEORADIUS failed")?;

        let mut live = Vec::new();
        for result in results {
            let account = match result.name.strip_prefix("driver:") {
                Some(account) => account.to_string(),
                None => continue,
            };

            // Liveness filter: no last-seen key means the driver went quiet
            // past the TTL. Prune the geo entry while we're here.
            let fresh: bool = conn
                .exists(Self::last_seen_key(&account))
                .await
                .context("failed to check driver liveness")?;
            if !fresh {
                debug!(driver = %account, "pruning stale presence entry");
                let _: () = conn
                    .zrem(GEO_SET, &result.name)
                    .await
                    .context("failed to prune stale driver")?;
                continue;
            }

            live.push(NearbyDriver {
                account,
                distance_km: result.dist.unwrap_or(0.0),
            });
        }

        // Redis orders by distance; re-sort to break distance ties by
        // account so candidate order is deterministic.
        live.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.account.cmp(&b.account))
        });
        live.truncate(limit);

        Ok(live)
    }
}

// =============================================================================
// In-memory implementation (tests, single-process deployments)
// =============================================================================

struct PresenceEntry {
    lat: f64,
    lng: f64,
    last_seen: tokio::time::Instant,
}

pub struct InMemoryPresenceIndex {
    entries: Mutex<HashMap<String, PresenceEntry>>,
    liveness_ttl: Duration,
}

impl InMemoryPresenceIndex {
    pub fn new(liveness_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            liveness_ttl,
        }
    }

    /// Whether a driver currently has a presence entry (fresh or not)
    pub fn contains(&self, driver: &str) -> bool {
        self.entries.lock().unwrap().contains_key(driver)
    }
}

#[async_trait]
impl BasePresenceIndex for InMemoryPresenceIndex {
    async fn heartbeat(&self, driver: &str, lat: f64, lng: f64) -> Result<()> {
        self.entries.lock().unwrap().insert(
            driver.to_string(),
            PresenceEntry {
                lat,
                lng,
                last_seen: tokio::time::Instant::now(),
            },
        );
        Ok(())
    }

    async fn mark_offline(&self, driver: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(driver);
        Ok(())
    }

    async fn nearest(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<NearbyDriver>> {
        let origin = GeoPoint::new(lat, lng);
        let now = tokio::time::Instant::now();

        let mut entries = self.entries.lock().unwrap();

        // Sweep stale entries first, then rank the rest
        entries.retain(|_, entry| now.duration_since(entry.last_seen) < self.liveness_ttl);

        let mut live: Vec<NearbyDriver> = entries
            .iter()
            .map(|(account, entry)| NearbyDriver {
                account: account.clone(),
                distance_km: distance_km(origin, GeoPoint::new(entry.lat, entry.lng)),
            })
            .filter(|d| d.distance_km <= radius_km)
            .collect();

        live.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.account.cmp(&b.account))
        });
        live.truncate(limit);

        Ok(live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> InMemoryPresenceIndex {
        InMemoryPresenceIndex::new(Duration::from_secs(300))
    }

    #[tokio::test]
    async fn nearest_orders_by_distance() {
        let idx = index();
        // Pickup at lower Manhattan; three drivers at increasing distance
        idx.heartbeat("d3", 40.7254, -74.0060).await.unwrap();
        idx.heartbeat("d1", 40.7155, -74.0060).await.unwrap();
        idx.heartbeat("d2", 40.7200, -74.0060).await.unwrap();

        let nearby = idx.nearest(40.7128, -74.0060, 5.0, 10).await.unwrap();
        let order: Vec<_> = nearby.iter().map(|d| d.account.as_str()).collect();
        assert_eq!(order, vec!["d1", "d2", "d3"]);
    }

    #[tokio::test]
    async fn nearest_respects_radius_and_limit() {
        let idx = index();
        idx.heartbeat("near", 40.7155, -74.0060).await.unwrap();
        idx.heartbeat("nearer", 40.7130, -74.0060).await.unwrap();
        // ~111 km north, outside any sane radius
        idx.heartbeat("far", 41.7128, -74.0060).await.unwrap();

        let nearby = idx.nearest(40.7128, -74.0060, 5.0, 10).await.unwrap();
        assert_eq!(nearby.len(), 2);

        let capped = idx.nearest(40.7128, -74.0060, 5.0, 1).await.unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].account, "nearer");
    }

    #[tokio::test]
    async fn distance_ties_break_by_account() {
        let idx = index();
        idx.heartbeat("zeta", 40.7128, -74.0060).await.unwrap();
        idx.heartbeat("alpha", 40.7128, -74.0060).await.unwrap();

        let nearby = idx.nearest(40.7128, -74.0060, 5.0, 10).await.unwrap();
        let order: Vec<_> = nearby.iter().map(|d| d.account.as_str()).collect();
        assert_eq!(order, vec!["alpha", "zeta"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entries_are_pruned_on_query() {
        let idx = index();
        idx.heartbeat("quiet", 40.7128, -74.0060).await.unwrap();

        tokio::time::advance(Duration::from_secs(301)).await;
        idx.heartbeat("chatty", 40.7128, -74.0060).await.unwrap();

        let nearby = idx.nearest(40.7128, -74.0060, 5.0, 10).await.unwrap();
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].account, "chatty");

        // The sweep removed the stale entry from the index itself
        assert!(!idx.contains("quiet"));
    }

    #[tokio::test]
    async fn mark_offline_removes_synchronously() {
        let idx = index();
        idx.heartbeat("d1", 40.7128, -74.0060).await.unwrap();
        idx.mark_offline("d1").await.unwrap();

        let nearby = idx.nearest(40.7128, -74.0060, 5.0, 10).await.unwrap();
        assert!(nearby.is_empty());
    }
}
