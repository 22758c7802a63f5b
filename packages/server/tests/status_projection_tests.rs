//! Status projection tests: the single view callers poll, stitched from the
//! ephemeral keys and the canonical row.

mod common;

use std::time::Duration;

use common::{advance_and_settle, EngineHarness};
use ride_core::domains::dispatch::{self, StatusReader, Verdict};
use ride_core::domains::rides::RideStatus;
use uuid::Uuid;

fn reader(h: &EngineHarness) -> StatusReader {
    StatusReader::new(h.td.requests.clone(), h.td.rides.clone())
}

#[tokio::test]
async fn unknown_request_reads_as_pending() {
    let h = EngineHarness::new();
    let view = reader(&h).get_status(Uuid::new_v4()).await.unwrap();

    assert_eq!(view.status, RideStatus::Pending);
    assert_eq!(view.driver_id, None);
    assert_eq!(view.estimated_arrival, None);
}

#[tokio::test(start_paused = true)]
async fn pending_request_exposes_no_driver() {
    let h = EngineHarness::new();
    h.user("anna");
    h.user("d1");
    let ride = h.admitted_ride("anna").await;
    h.engine.admit(&ride, vec!["d1".into()]).await.unwrap();

    let view = reader(&h).get_status(ride.id).await.unwrap();
    assert_eq!(view.status, RideStatus::Pending);
    assert_eq!(view.driver_id, None);
    assert_eq!(view.estimated_arrival, None);
}

#[tokio::test(start_paused = true)]
async fn accepted_request_exposes_driver_and_eta() {
    let h = EngineHarness::new();
    h.user("anna");
    h.user("d1");
    let ride = h.admitted_ride("anna").await;
    h.engine.admit(&ride, vec!["d1".into()]).await.unwrap();

    dispatch::respond(
        &h.engine,
        ride.id,
        "d1",
        Verdict::Accept { eta_minutes: 6 },
    )
    .await
    .unwrap();

    let view = reader(&h).get_status(ride.id).await.unwrap();
    assert_eq!(view.status, RideStatus::Accepted);
    assert_eq!(view.driver_id.as_deref(), Some("d1"));
    assert_eq!(view.estimated_arrival, Some(6));
}

#[tokio::test(start_paused = true)]
async fn expired_ephemera_fall_back_to_the_canonical_row() {
    let h = EngineHarness::new();
    h.user("anna");
    h.user("d1");
    let ride = h.admitted_ride("anna").await;
    h.engine.admit(&ride, vec!["d1".into()]).await.unwrap();

    dispatch::respond(
        &h.engine,
        ride.id,
        "d1",
        Verdict::Accept { eta_minutes: 6 },
    )
    .await
    .unwrap();

    // Past the accepted-state retention (3600 s) every ephemeral key is gone
    advance_and_settle(Duration::from_secs(3601)).await;

    let view = reader(&h).get_status(ride.id).await.unwrap();
    assert_eq!(view.status, RideStatus::Accepted);
    assert_eq!(view.driver_id.as_deref(), Some("d1"));
    // ETA lived only in the coordinator
    assert_eq!(view.estimated_arrival, None);
}

#[tokio::test(start_paused = true)]
async fn exhausted_request_reads_as_no_drivers_available() {
    let h = EngineHarness::new();
    h.user("anna");
    let ride = h.admitted_ride("anna").await;
    h.engine.admit(&ride, vec![]).await.unwrap();

    let view = reader(&h).get_status(ride.id).await.unwrap();
    assert_eq!(view.status, RideStatus::NoDriversAvailable);
    assert_eq!(view.driver_id, None);
}
