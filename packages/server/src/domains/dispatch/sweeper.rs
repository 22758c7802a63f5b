//! Stranded-dispatch sweeper.
//!
//! In-process offer timers die with their worker. The sweeper is the
//! durability fallback: every half minute it scans requests with live
//! dispatch state and hands the stranded ones (pending, offeree key lapsed)
//! back to the engine, which synthesizes the missing timeout and advances.

use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::dispatch::engine::DispatchEngine;

/// Start the sweeper. The returned scheduler must be kept alive (and shut
/// down) by the caller.
pub async fn start_sweeper(engine: Arc<DispatchEngine>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let sweep_job = Job::new_async("*/30 * * * * *", move |_uuid, _lock| {
        let engine = engine.clone();
        Box::pin(async move {
            if let Err(e) = engine.recover_stalled().await {
                tracing::error!("dispatch sweep failed: {}", e);
            }
        })
    })?;

    scheduler.add(sweep_job).await?;
    scheduler.start().await?;

    tracing::info!("dispatch sweeper started (every 30 s)");
    Ok(scheduler)
}
