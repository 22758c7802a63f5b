//! Per-offer acceptance timers.
//!
//! One timer per request: armed when an offer goes out, disarmed on accept,
//! decline, cancel or resolution. A fire delivers `timeout(request, driver)`
//! to the engine, which no-ops if the offer has since moved on, so a timer
//! that loses a race is harmless. In-process timers are the fast path; the
//! sweeper covers timers lost to a crashed worker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use uuid::Uuid;

use crate::domains::dispatch::engine::DispatchEngine;

#[derive(Default)]
pub struct OfferTimers {
    timers: Mutex<HashMap<Uuid, CancellationToken>>,
}

impl OfferTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a single timeout fire for `(request, driver)`. Re-arming a
    /// request cancels its previous timer.
    pub fn arm(
        &self,
        engine: Arc<DispatchEngine>,
        request_id: Uuid,
        driver: String,
        duration: Duration,
    ) {
        let token = CancellationToken::new();

        if let Some(prev) = self
            .timers
            .lock()
            .unwrap()
            .insert(request_id, token.clone())
        {
            prev.cancel();
        }

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(request_id = %request_id, driver = %driver, "offer timer disarmed");
                }
                _ = tokio::time::sleep(duration) => {
                    if let Err(e) = engine.timeout(request_id, &driver).await {
                        error!(request_id = %request_id, driver = %driver, error = %e, "offer timeout handling failed");
                    }
                }
            }
        });
    }

    /// Cancel any outstanding timer for a request
    pub fn disarm(&self, request_id: Uuid) {
        if let Some(token) = self.timers.lock().unwrap().remove(&request_id) {
            token.cancel();
        }
    }

    /// Cancel everything (graceful shutdown)
    pub fn disarm_all(&self) {
        let mut timers = self.timers.lock().unwrap();
        for (_, token) in timers.drain() {
            token.cancel();
        }
    }
}
