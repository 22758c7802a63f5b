//! Redis-backed store tests.
//!
//! These exercise the production `RedisRequestStore` and
//! `RedisPresenceIndex` against a real Redis container. They require a
//! Docker daemon, so they are `#[ignore]`d by default:
//!
//! ```text
//! cargo test --test coordinator_store_tests -- --ignored
//! ```

mod common;

use std::time::Duration;

use common::harness::SharedTestInfra;
use ride_core::domains::dispatch::store::{BaseRequestStore, RedisRequestStore};
use ride_core::domains::drivers::presence::{BasePresenceIndex, RedisPresenceIndex};
use uuid::Uuid;

const TTL: Duration = Duration::from_secs(600);

#[tokio::test]
#[ignore] // Requires Docker
async fn redis_offeree_cas_has_a_single_winner() {
    let infra = SharedTestInfra::get().await;
    let store = RedisRequestStore::new(infra.coordinator().await);
    let id = Uuid::new_v4();

    assert!(store.set_current_offeree(id, "d1", None, TTL).await.unwrap());
    assert!(!store.set_current_offeree(id, "d2", None, TTL).await.unwrap());
    assert_eq!(
        store.get_current_offeree(id).await.unwrap().as_deref(),
        Some("d1")
    );

    // Handoff with the correct expected value
    assert!(store
        .set_current_offeree(id, "d2", Some("d1"), TTL)
        .await
        .unwrap());

    // Take is atomic and single-winner
    assert!(store.take_current_offeree(id, "d2").await.unwrap());
    assert!(!store.take_current_offeree(id, "d2").await.unwrap());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn redis_queue_preserves_seed_order() {
    let infra = SharedTestInfra::get().await;
    let store = RedisRequestStore::new(infra.coordinator().await);
    let id = Uuid::new_v4();

    let seeded = store
        .seed_queue(
            id,
            &["d1".to_string(), "d2".to_string(), "d3".to_string()],
            TTL,
        )
        .await
        .unwrap();
    assert_eq!(seeded, 3);

    assert_eq!(store.pop_next(id).await.unwrap().as_deref(), Some("d1"));
    assert_eq!(store.pop_next(id).await.unwrap().as_deref(), Some("d2"));
    assert_eq!(store.pop_next(id).await.unwrap().as_deref(), Some("d3"));
    assert_eq!(store.pop_next(id).await.unwrap(), None);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn redis_presence_ranks_by_distance_and_prunes_offline() {
    let infra = SharedTestInfra::get().await;
    let presence = RedisPresenceIndex::new(infra.coordinator().await, Duration::from_secs(300));

    presence.heartbeat("geo-far", 40.7272, -74.0060).await.unwrap();
    presence.heartbeat("geo-near", 40.7155, -74.0060).await.unwrap();

    let nearby = presence.nearest(40.7128, -74.0060, 5.0, 10).await.unwrap();
    let order: Vec<_> = nearby
        .iter()
        .filter(|d| d.account.starts_with("geo-"))
        .map(|d| d.account.as_str())
        .collect();
    assert_eq!(order, vec!["geo-near", "geo-far"]);

    presence.mark_offline("geo-near").await.unwrap();
    let nearby = presence.nearest(40.7128, -74.0060, 5.0, 10).await.unwrap();
    assert!(!nearby.iter().any(|d| d.account == "geo-near"));
}
