//! The per-request dispatch state machine.
//!
//! States: pending → offering → accepted | exhausted | cancelled. Every
//! transition is derived from coordinator reads; the only synchronization is
//! the compare-and-set on the current-offeree key. A worker that loses that
//! CAS simply stops; the winner owns the advance.
//!
//! ```text
//! admit ──► advance ──► offer to next candidate ── accept ──► accepted
//!              ▲              │   │
//!              │           decline timeout
//!              └──────────────┘   │
//!              └──────────────────┘        queue empty ──► exhausted
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domains::dispatch::error::DispatchError;
use crate::domains::dispatch::store::{DriverResponse, ResponseEntry};
use crate::domains::dispatch::timer::OfferTimers;
use crate::domains::notifications::{NotificationDispatcher, PushMessage};
use crate::domains::rides::data::TripData;
use crate::domains::rides::{RideRequest, RideStatus};
use crate::kernel::ServerDeps;

/// TTL on the current-offeree key. Longer than the offer window so the
/// in-process timer normally fires first; its expiry is what the sweeper
/// treats as a crashed worker.
const OFFEREE_TTL: Duration = Duration::from_secs(120);

/// Driver verdict on an open offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept { eta_minutes: u32 },
    Decline,
}

pub struct DispatchEngine {
    deps: Arc<ServerDeps>,
    notifier: NotificationDispatcher,
    timers: OfferTimers,
}

impl DispatchEngine {
    pub fn new(deps: Arc<ServerDeps>) -> Arc<Self> {
        Arc::new(Self {
            notifier: NotificationDispatcher::new(deps.users.clone(), deps.push.clone()),
            timers: OfferTimers::new(),
            deps,
        })
    }

    pub fn deps(&self) -> &Arc<ServerDeps> {
        &self.deps
    }

    /// Enter dispatch with the candidate list (ascending distance from the
    /// pickup point). An empty list resolves the request immediately.
    pub async fn admit(
        self: &Arc<Self>,
        ride: &RideRequest,
        candidates: Vec<String>,
    ) -> Result<(), DispatchError> {
        if candidates.is_empty() {
            info!(request_id = %ride.id, "no candidates at admission");
            return self.resolve_exhausted(ride).await;
        }

        let seeded = self
            .deps
            .requests
            .seed_queue(ride.id, &candidates, self.deps.dispatch.queue_ttl)
            .await?;
        debug!(request_id = %ride.id, candidates = seeded, "candidate queue seeded");

        self.advance(ride).await
    }

    /// Apply a driver's verdict. Errors with `NotCurrentOfferee` or
    /// `AlreadyResolved` when the verdict does not apply; at most one caller
    /// ever gets `Ok` for an accept thanks to the atomic offeree take.
    pub async fn respond(
        self: &Arc<Self>,
        ride: &RideRequest,
        driver: &str,
        verdict: Verdict,
    ) -> Result<(), DispatchError> {
        match self.deps.requests.get_status(ride.id).await? {
            Some(RideStatus::Pending) => {}
            _ => return Err(DispatchError::AlreadyResolved(ride.id)),
        }

        if !self
            .deps
            .requests
            .take_current_offeree(ride.id, driver)
            .await?
        {
            // Either the offer moved on, or a concurrent response won the take.
            return match self.deps.requests.get_status(ride.id).await? {
                Some(RideStatus::Pending) => Err(DispatchError::NotCurrentOfferee {
                    request_id: ride.id,
                    driver: driver.to_string(),
                }),
                _ => Err(DispatchError::AlreadyResolved(ride.id)),
            };
        }

        self.timers.disarm(ride.id);

        match verdict {
            Verdict::Accept { eta_minutes } => {
                self.resolve_accepted(ride, driver, eta_minutes).await
            }
            Verdict::Decline => {
                self.deps
                    .requests
                    .append_response(
                        ride.id,
                        &ResponseEntry::now(driver, DriverResponse::Decline),
                        self.deps.dispatch.response_log_ttl,
                    )
                    .await?;
                info!(request_id = %ride.id, driver = %driver, "driver declined");
                self.advance(ride).await
            }
        }
    }

    /// Offer window elapsed for `(request, driver)`. A fire that arrives
    /// after the offer moved on (or the request resolved) is a no-op.
    pub async fn timeout(
        self: &Arc<Self>,
        request_id: Uuid,
        driver: &str,
    ) -> Result<(), DispatchError> {
        match self.deps.requests.get_status(request_id).await? {
            Some(RideStatus::Pending) => {}
            _ => {
                debug!(request_id = %request_id, driver = %driver, "timeout after resolution, ignoring");
                return Ok(());
            }
        }

        if !self
            .deps
            .requests
            .take_current_offeree(request_id, driver)
            .await?
        {
            debug!(request_id = %request_id, driver = %driver, "timeout for a stale offer, ignoring");
            return Ok(());
        }

        self.deps
            .requests
            .append_response(
                request_id,
                &ResponseEntry::now(driver, DriverResponse::Timeout),
                self.deps.dispatch.response_log_ttl,
            )
            .await?;

        info!(request_id = %request_id, driver = %driver, "offer timed out");

        if let Err(e) = self
            .notifier
            .send(driver, PushMessage::RideRequestExpired { request_id })
            .await
        {
            warn!(request_id = %request_id, driver = %driver, error = %e, "expiry push failed");
        }

        let Some(ride) = self.deps.rides.find_by_id(request_id).await? else {
            error!(request_id = %request_id, "canonical row missing during timeout");
            return Err(DispatchError::RequestNotFound(request_id));
        };

        self.advance(&ride).await
    }

    /// Passenger-initiated cancel; legal only before resolution
    pub async fn cancel(self: &Arc<Self>, request_id: Uuid) -> Result<(), DispatchError> {
        match self.deps.requests.get_status(request_id).await? {
            Some(RideStatus::Pending) => {}
            Some(_) => return Err(DispatchError::AlreadyResolved(request_id)),
            None => {
                // Ephemera expired; the canonical row decides whether cancel
                // is still meaningful.
                if let Some(ride) = self.deps.rides.find_by_id(request_id).await? {
                    if ride.ride_status() != RideStatus::Pending {
                        return Err(DispatchError::AlreadyResolved(request_id));
                    }
                }
            }
        }

        self.timers.disarm(request_id);

        let cfg = &self.deps.dispatch;
        self.deps
            .requests
            .set_status(request_id, RideStatus::Cancelled, cfg.queue_ttl)
            .await?;
        self.deps
            .requests
            .delete_dispatch_ephemera(request_id)
            .await?;
        self.deps.requests.remove_active(request_id).await?;
        self.deps
            .rides
            .set_status(request_id, RideStatus::Cancelled)
            .await?;

        info!(request_id = %request_id, "ride request cancelled");
        Ok(())
    }

    /// Sweeper entry: rescue requests stranded by a crashed worker.
    ///
    /// A request counts as stranded when it is still `pending`, its offeree
    /// key has lapsed (120 s TTL, no timer fired) and it has made at least
    /// one offer. The stranded driver gets a synthesized timeout; then the
    /// normal advance takes over.
    pub async fn recover_stalled(self: &Arc<Self>) -> Result<(), DispatchError> {
        for request_id in self.deps.requests.active_requests().await? {
            if let Err(e) = self.recover_one(request_id).await {
                error!(request_id = %request_id, error = %e, "stalled-dispatch recovery failed");
            }
        }
        Ok(())
    }

    async fn recover_one(self: &Arc<Self>, request_id: Uuid) -> Result<(), DispatchError> {
        match self.deps.requests.get_status(request_id).await? {
            Some(RideStatus::Pending) => {
                if self
                    .deps
                    .requests
                    .get_current_offeree(request_id)
                    .await?
                    .is_some()
                {
                    // Offer still live; its timer owns the next move.
                    return Ok(());
                }

                // No offer was ever made: admission may still be computing
                // candidates, so leave it alone. The status TTL bounds how
                // long that state can exist.
                let Some(driver) = self.deps.requests.last_offer(request_id).await? else {
                    return Ok(());
                };

                let log = self.deps.requests.responses(request_id).await?;
                if !log.iter().any(|entry| entry.driver_id == driver) {
                    info!(request_id = %request_id, driver = %driver, "synthesizing timeout for stranded offer");
                    self.deps
                        .requests
                        .append_response(
                            request_id,
                            &ResponseEntry::now(&driver, DriverResponse::Timeout),
                            self.deps.dispatch.response_log_ttl,
                        )
                        .await?;
                    if let Err(e) = self
                        .notifier
                        .send(&driver, PushMessage::RideRequestExpired { request_id })
                        .await
                    {
                        warn!(request_id = %request_id, driver = %driver, error = %e, "expiry push failed");
                    }
                }

                let Some(ride) = self.deps.rides.find_by_id(request_id).await? else {
                    self.deps.requests.remove_active(request_id).await?;
                    return Err(DispatchError::RequestNotFound(request_id));
                };
                self.advance(&ride).await
            }
            Some(_) => {
                // Terminal but still in the active set: clean up.
                self.deps
                    .requests
                    .delete_dispatch_ephemera(request_id)
                    .await?;
                self.deps.requests.remove_active(request_id).await?;
                Ok(())
            }
            None => {
                // Every ephemeral key expired. Observers fall back to the
                // canonical row; mark it unserviced if it never resolved.
                if let Some(ride) = self.deps.rides.find_by_id(request_id).await? {
                    if ride.ride_status() == RideStatus::Pending {
                        self.deps
                            .rides
                            .set_status(request_id, RideStatus::NoDriversAvailable)
                            .await?;
                    }
                }
                self.deps
                    .requests
                    .delete_dispatch_ephemera(request_id)
                    .await?;
                self.deps.requests.remove_active(request_id).await?;
                Ok(())
            }
        }
    }

    /// Cancel all outstanding timers. New admissions should already have
    /// stopped when this is called.
    pub fn shutdown(&self) {
        self.timers.disarm_all();
    }

    /// End one offer and start the next, or resolve the request.
    ///
    /// Carries the full canonical row so every offer push contains the
    /// complete trip payload, not only the first.
    async fn advance(self: &Arc<Self>, ride: &RideRequest) -> Result<(), DispatchError> {
        loop {
            // A lapsed queue TTL reads as an empty queue: the request exhausts.
            let Some(driver) = self.deps.requests.pop_next(ride.id).await? else {
                return self.resolve_exhausted(ride).await;
            };

            // A driver that already responded is never offered again
            let log = self.deps.requests.responses(ride.id).await?;
            if log.iter().any(|entry| entry.driver_id == driver) {
                debug!(request_id = %ride.id, driver = %driver, "skipping already-responded candidate");
                continue;
            }

            if !self
                .deps
                .requests
                .set_current_offeree(ride.id, &driver, None, OFFEREE_TTL)
                .await?
            {
                // Another worker holds the advance; this pop is discarded.
                debug!(request_id = %ride.id, driver = %driver, "offeree CAS lost, yielding advance");
                return Ok(());
            }

            self.deps
                .requests
                .set_last_offer(ride.id, &driver, self.deps.dispatch.queue_ttl)
                .await?;

            info!(request_id = %ride.id, driver = %driver, "offering ride");

            // Delivery failure does not roll the offer back: the timer will
            // advance past an unreachable driver.
            let trip = TripData::from(ride);
            if let Err(e) = self
                .notifier
                .send(&driver, PushMessage::RideRequest { trip })
                .await
            {
                warn!(request_id = %ride.id, driver = %driver, error = %e, "offer push failed");
            }

            self.timers.arm(
                self.clone(),
                ride.id,
                driver,
                self.deps.dispatch.offer_timeout,
            );
            return Ok(());
        }
    }

    async fn resolve_accepted(
        self: &Arc<Self>,
        ride: &RideRequest,
        driver: &str,
        eta_minutes: u32,
    ) -> Result<(), DispatchError> {
        let cfg = &self.deps.dispatch;
        let requests = &self.deps.requests;

        // Queue and offeree go first so no later advance can offer anyone
        // else. The offeree key is already gone (the take in `respond`).
        requests.drop_queue(ride.id).await?;
        requests
            .append_response(
                ride.id,
                &ResponseEntry::now(driver, DriverResponse::Accept),
                cfg.response_log_ttl,
            )
            .await?;
        requests
            .set_status(ride.id, RideStatus::Accepted, cfg.accepted_ttl)
            .await?;
        requests
            .set_assigned_driver(ride.id, driver, cfg.accepted_ttl)
            .await?;
        requests.set_eta(ride.id, eta_minutes, cfg.accepted_ttl).await?;
        requests.delete_dispatch_ephemera(ride.id).await?;
        requests.remove_active(ride.id).await?;

        self.deps.rides.assign_driver(ride.id, driver).await?;

        info!(request_id = %ride.id, driver = %driver, eta_minutes, "ride accepted");

        let driver_name = match self.deps.users.find_by_account(driver).await {
            Ok(Some(user)) => user.display_name,
            _ => driver.to_string(),
        };

        if let Err(e) = self
            .notifier
            .send(
                &ride.passenger_account,
                PushMessage::RideAccepted {
                    request_id: ride.id,
                    driver: driver.to_string(),
                    driver_name,
                    eta_minutes,
                },
            )
            .await
        {
            warn!(request_id = %ride.id, error = %e, "accept push failed");
        }

        Ok(())
    }

    async fn resolve_exhausted(self: &Arc<Self>, ride: &RideRequest) -> Result<(), DispatchError> {
        let cfg = &self.deps.dispatch;

        self.timers.disarm(ride.id);
        self.deps
            .requests
            .set_status(ride.id, RideStatus::NoDriversAvailable, cfg.queue_ttl)
            .await?;
        self.deps.requests.delete_dispatch_ephemera(ride.id).await?;
        self.deps.requests.remove_active(ride.id).await?;
        self.deps
            .rides
            .set_status(ride.id, RideStatus::NoDriversAvailable)
            .await?;

        info!(request_id = %ride.id, "candidates exhausted");

        if let Err(e) = self
            .notifier
            .send(
                &ride.passenger_account,
                PushMessage::NoDriversAvailable {
                    request_id: ride.id,
                },
            )
            .await
        {
            warn!(request_id = %ride.id, error = %e, "exhaustion push failed");
        }

        Ok(())
    }
}
