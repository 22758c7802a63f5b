//! Dispatch engine scenario tests.
//!
//! End-to-end walks of the offer state machine on in-memory dependencies
//! with a paused clock: acceptance, timeout cascades, exhaustion, wrong
//! drivers, races and recovery.

mod common;

use std::time::Duration;

use common::{advance_and_settle, settle, EngineHarness};
use ride_core::domains::dispatch::{self, BaseRequestStore, DriverResponse, Verdict};
use ride_core::domains::drivers::presence::BasePresenceIndex;
use ride_core::domains::rides::{BaseRideStore, RideStatus};

#[tokio::test(start_paused = true)]
async fn s1_first_driver_accepts() {
    let h = EngineHarness::new();
    let passenger_token = h.user("anna");
    let d1_token = h.user("d1");
    let d2_token = h.user("d2");
    h.user("d3");
    let ride = h.admitted_ride("anna").await;

    h.engine
        .admit(&ride, vec!["d1".into(), "d2".into(), "d3".into()])
        .await
        .unwrap();

    assert_eq!(
        h.td.requests
            .get_current_offeree(ride.id)
            .await
            .unwrap()
            .as_deref(),
        Some("d1")
    );

    advance_and_settle(Duration::from_secs(12)).await;

    let outcome = dispatch::respond(
        &h.engine,
        ride.id,
        "d1",
        Verdict::Accept { eta_minutes: 5 },
    )
    .await
    .unwrap();
    assert!(outcome.applied);

    // Ephemeral view
    assert_eq!(
        h.td.requests.get_status(ride.id).await.unwrap(),
        Some(RideStatus::Accepted)
    );
    assert_eq!(
        h.td.requests
            .get_assigned_driver(ride.id)
            .await
            .unwrap()
            .as_deref(),
        Some("d1")
    );
    assert_eq!(h.td.requests.get_eta(ride.id).await.unwrap(), Some(5));

    // Canonical view
    let canonical = h.td.rides.find_by_id(ride.id).await.unwrap().unwrap();
    assert_eq!(canonical.ride_status(), RideStatus::Accepted);
    assert_eq!(canonical.assigned_driver.as_deref(), Some("d1"));

    // Pushes: one offer to d1, one accept to the passenger, silence for d2/d3
    assert_eq!(h.offered_drivers(), vec![d1_token.clone()]);
    assert_eq!(h.td.push.sent_to(&passenger_token, "ride_accepted").len(), 1);
    assert!(h.td.push.sent_to(&d2_token, "ride_request").is_empty());

    // Response log
    let log = h.td.requests.responses(ride.id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].driver_id, "d1");
    assert_eq!(log[0].response, DriverResponse::Accept);

    // The offer timer was disarmed: nothing fires later
    advance_and_settle(Duration::from_secs(120)).await;
    assert_eq!(h.td.requests.responses(ride.id).await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn s2_cascade_to_third_driver() {
    let h = EngineHarness::new();
    h.user("anna");
    let d1_token = h.user("d1");
    let d2_token = h.user("d2");
    let d3_token = h.user("d3");
    let ride = h.admitted_ride("anna").await;

    h.engine
        .admit(&ride, vec!["d1".into(), "d2".into(), "d3".into()])
        .await
        .unwrap();

    // t = 60 s: d1's window elapses, offer moves to d2
    advance_and_settle(Duration::from_secs(60)).await;
    assert_eq!(
        h.td.requests
            .get_current_offeree(ride.id)
            .await
            .unwrap()
            .as_deref(),
        Some("d2")
    );

    // t = 65 s: d2 declines, offer moves to d3
    advance_and_settle(Duration::from_secs(5)).await;
    let outcome = dispatch::respond(&h.engine, ride.id, "d2", Verdict::Decline)
        .await
        .unwrap();
    assert!(outcome.applied);
    assert_eq!(
        h.td.requests
            .get_current_offeree(ride.id)
            .await
            .unwrap()
            .as_deref(),
        Some("d3")
    );

    // t = 70 s: d3 accepts
    advance_and_settle(Duration::from_secs(5)).await;
    let outcome = dispatch::respond(
        &h.engine,
        ride.id,
        "d3",
        Verdict::Accept { eta_minutes: 7 },
    )
    .await
    .unwrap();
    assert!(outcome.applied);

    let canonical = h.td.rides.find_by_id(ride.id).await.unwrap().unwrap();
    assert_eq!(canonical.assigned_driver.as_deref(), Some("d3"));

    let log = h.td.requests.responses(ride.id).await.unwrap();
    let entries: Vec<_> = log
        .iter()
        .map(|e| (e.driver_id.as_str(), e.response))
        .collect();
    assert_eq!(
        entries,
        vec![
            ("d1", DriverResponse::Timeout),
            ("d2", DriverResponse::Decline),
            ("d3", DriverResponse::Accept),
        ]
    );

    // Expiry push went to d1 and only d1
    assert_eq!(h.td.push.sent_to(&d1_token, "ride_request_expired").len(), 1);
    assert!(h.td.push.sent_to(&d2_token, "ride_request_expired").is_empty());
    assert!(h.td.push.sent_to(&d3_token, "ride_request_expired").is_empty());
}

#[tokio::test(start_paused = true)]
async fn s3_exhaustion_notifies_passenger_once() {
    let h = EngineHarness::new();
    let passenger_token = h.user("anna");
    h.user("d1");
    h.user("d2");
    let ride = h.admitted_ride("anna").await;

    h.engine
        .admit(&ride, vec!["d1".into(), "d2".into()])
        .await
        .unwrap();

    advance_and_settle(Duration::from_secs(60)).await;
    advance_and_settle(Duration::from_secs(60)).await;

    assert_eq!(
        h.td.requests.get_status(ride.id).await.unwrap(),
        Some(RideStatus::NoDriversAvailable)
    );
    assert_eq!(
        h.td.rides
            .find_by_id(ride.id)
            .await
            .unwrap()
            .unwrap()
            .ride_status(),
        RideStatus::NoDriversAvailable
    );

    assert_eq!(
        h.td.push
            .sent_to(&passenger_token, "no_drivers_available")
            .len(),
        1
    );

    // Queue and offeree keys removed, request no longer tracked as active
    assert_eq!(h.td.requests.get_current_offeree(ride.id).await.unwrap(), None);
    assert_eq!(h.td.requests.pop_next(ride.id).await.unwrap(), None);
    assert!(h.td.requests.active_requests().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn s4_wrong_driver_response_is_rejected() {
    let h = EngineHarness::new();
    let passenger_token = h.user("anna");
    h.user("d1");
    h.user("d2");
    let ride = h.admitted_ride("anna").await;

    h.engine
        .admit(&ride, vec!["d1".into(), "d2".into()])
        .await
        .unwrap();

    // d2 jumps the queue while d1 holds the offer
    let outcome = dispatch::respond(
        &h.engine,
        ride.id,
        "d2",
        Verdict::Accept { eta_minutes: 3 },
    )
    .await
    .unwrap();

    assert!(!outcome.applied);
    assert_eq!(outcome.reason, Some("not_current_offeree"));

    // Nothing moved
    assert_eq!(
        h.td.requests.get_status(ride.id).await.unwrap(),
        Some(RideStatus::Pending)
    );
    assert_eq!(
        h.td.requests
            .get_current_offeree(ride.id)
            .await
            .unwrap()
            .as_deref(),
        Some("d1")
    );
    assert!(h.td.push.sent_to(&passenger_token, "ride_accepted").is_empty());
    assert!(h.td.requests.responses(ride.id).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn s5_double_accept_applies_exactly_once() {
    let h = EngineHarness::new();
    h.user("anna");
    h.user("d1");
    let ride = h.admitted_ride("anna").await;

    h.engine.admit(&ride, vec!["d1".into()]).await.unwrap();

    let first = dispatch::respond(
        &h.engine,
        ride.id,
        "d1",
        Verdict::Accept { eta_minutes: 5 },
    );
    let second = dispatch::respond(
        &h.engine,
        ride.id,
        "d1",
        Verdict::Accept { eta_minutes: 5 },
    );

    let (first, second) = tokio::join!(first, second);
    let applied = [first.unwrap().applied, second.unwrap().applied];
    assert_eq!(applied.iter().filter(|a| **a).count(), 1);

    // Both observers converge on the same assignment
    let canonical = h.td.rides.find_by_id(ride.id).await.unwrap().unwrap();
    assert_eq!(canonical.ride_status(), RideStatus::Accepted);
    assert_eq!(canonical.assigned_driver.as_deref(), Some("d1"));
    assert_eq!(
        h.td.requests.get_status(ride.id).await.unwrap(),
        Some(RideStatus::Accepted)
    );

    let log = h.td.requests.responses(ride.id).await.unwrap();
    assert_eq!(log.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn s6_unreachable_candidate_is_skipped_without_double_notification() {
    let h = EngineHarness::new();
    h.user("anna");
    // d1 registered but never got a push credential; also dropped offline
    // between candidate selection and the offer
    h.mute_user("d1");
    let d2_token = h.user("d2");
    let ride = h.admitted_ride("anna").await;

    h.td.presence.heartbeat("d1", 40.7155, -74.0060).await.unwrap();
    h.engine
        .admit(&ride, vec!["d1".into(), "d2".into()])
        .await
        .unwrap();
    h.td.presence.mark_offline("d1").await.unwrap();

    // The credential miss is a no-op delivery; the timer still governs the
    // offer, then the engine moves on to d2.
    advance_and_settle(Duration::from_secs(60)).await;

    assert_eq!(
        h.td.requests
            .get_current_offeree(ride.id)
            .await
            .unwrap()
            .as_deref(),
        Some("d2")
    );
    assert_eq!(h.offered_drivers(), vec![d2_token]);

    let outcome = dispatch::respond(
        &h.engine,
        ride.id,
        "d2",
        Verdict::Accept { eta_minutes: 4 },
    )
    .await
    .unwrap();
    assert!(outcome.applied);

    // d1 appears exactly once in the log (its timeout), never twice
    let log = h.td.requests.responses(ride.id).await.unwrap();
    let d1_entries: Vec<_> = log.iter().filter(|e| e.driver_id == "d1").collect();
    assert_eq!(d1_entries.len(), 1);
    assert_eq!(d1_entries[0].response, DriverResponse::Timeout);
}

#[tokio::test(start_paused = true)]
async fn responded_driver_is_never_reoffered() {
    let h = EngineHarness::new();
    h.user("anna");
    let d1_token = h.user("d1");
    h.user("d2");
    let ride = h.admitted_ride("anna").await;

    h.engine
        .admit(&ride, vec!["d1".into(), "d2".into()])
        .await
        .unwrap();

    let outcome = dispatch::respond(&h.engine, ride.id, "d1", Verdict::Decline)
        .await
        .unwrap();
    assert!(outcome.applied);

    // A duplicate of d1 sneaks back into the queue (e.g. a raced re-seed);
    // the advance must skip it rather than offer d1 twice.
    h.td.requests
        .seed_queue(ride.id, &["d1".to_string()], Duration::from_secs(600))
        .await
        .unwrap();

    advance_and_settle(Duration::from_secs(60)).await;

    assert_eq!(h.td.push.sent_to(&d1_token, "ride_request").len(), 1);
    assert_eq!(
        h.td.requests.get_status(ride.id).await.unwrap(),
        Some(RideStatus::NoDriversAvailable)
    );
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_dispatch_and_blocks_late_accepts() {
    let h = EngineHarness::new();
    h.user("anna");
    h.user("d1");
    let ride = h.admitted_ride("anna").await;

    h.engine.admit(&ride, vec!["d1".into()]).await.unwrap();

    let applied = dispatch::cancel(&h.engine, ride.id).await.unwrap();
    assert!(applied);
    assert_eq!(
        h.td.requests.get_status(ride.id).await.unwrap(),
        Some(RideStatus::Cancelled)
    );

    // The armed timer fires into a cancelled request: no-op
    advance_and_settle(Duration::from_secs(60)).await;
    assert!(h.td.requests.responses(ride.id).await.unwrap().is_empty());

    // A late accept is rejected
    let outcome = dispatch::respond(
        &h.engine,
        ride.id,
        "d1",
        Verdict::Accept { eta_minutes: 2 },
    )
    .await
    .unwrap();
    assert!(!outcome.applied);
    assert_eq!(outcome.reason, Some("already_resolved"));

    // Cancelling twice reports not-applied
    assert!(!dispatch::cancel(&h.engine, ride.id).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn sweeper_rescues_a_stranded_offer() {
    let h = EngineHarness::new();
    h.user("anna");
    let d1_token = h.user("d1");
    let d2_token = h.user("d2");
    let ride = h.admitted_ride("anna").await;

    h.engine
        .admit(&ride, vec!["d1".into(), "d2".into()])
        .await
        .unwrap();
    assert_eq!(h.offered_drivers(), vec![d1_token.clone()]);

    // Simulate the offering worker crashing: its offeree key expires with no
    // timer left to fire.
    h.td.requests.expire_current_offeree(ride.id);

    h.engine.recover_stalled().await.unwrap();
    settle().await;

    // The stranded driver got a synthesized timeout and dispatch moved on
    let log = h.td.requests.responses(ride.id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].driver_id, "d1");
    assert_eq!(log[0].response, DriverResponse::Timeout);
    assert_eq!(h.td.push.sent_to(&d1_token, "ride_request_expired").len(), 1);

    assert_eq!(
        h.td.requests
            .get_current_offeree(ride.id)
            .await
            .unwrap()
            .as_deref(),
        Some("d2")
    );
    assert_eq!(h.td.push.sent_to(&d2_token, "ride_request").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn create_and_dispatch_offers_nearest_live_driver() {
    let h = EngineHarness::new();
    h.user("anna");
    let near_token = h.user("near");
    h.user("far");
    h.user("outside");

    // near ≈ 0.3 km, far ≈ 1.6 km, outside ≈ 111 km from the pickup
    h.td.presence.heartbeat("far", 40.7272, -74.0060).await.unwrap();
    h.td.presence.heartbeat("near", 40.7155, -74.0060).await.unwrap();
    h.td.presence
        .heartbeat("outside", 41.7128, -74.0060)
        .await
        .unwrap();

    let ride = dispatch::create_and_dispatch(&h.engine, common::new_request("anna"))
        .await
        .unwrap();
    assert_eq!(ride.ride_status(), RideStatus::Pending);

    // Candidate search runs in the background
    settle().await;

    assert_eq!(
        h.td.requests
            .get_current_offeree(ride.id)
            .await
            .unwrap()
            .as_deref(),
        Some("near")
    );
    assert_eq!(h.offered_drivers(), vec![near_token]);
}

#[tokio::test(start_paused = true)]
async fn create_and_dispatch_with_nobody_online_resolves_immediately() {
    let h = EngineHarness::new();
    let passenger_token = h.user("anna");

    let ride = dispatch::create_and_dispatch(&h.engine, common::new_request("anna"))
        .await
        .unwrap();

    settle().await;

    assert_eq!(
        h.td.requests.get_status(ride.id).await.unwrap(),
        Some(RideStatus::NoDriversAvailable)
    );
    assert_eq!(
        h.td.push
            .sent_to(&passenger_token, "no_drivers_available")
            .len(),
        1
    );
}
