//! Redis coordinator connection.
//!
//! All ephemeral dispatch state (candidate queues, current offeree, response
//! logs, presence liveness) lives in Redis with TTLs. The coordinator is a
//! process-wide singleton created at startup; `ConnectionManager` reconnects
//! on its own, so holders just clone connections per operation.

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;

#[derive(Clone)]
pub struct Coordinator {
    conn: ConnectionManager,
}

impl Coordinator {
    /// Connect to Redis and establish the managed connection
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid Redis URL")?;
        let conn = client
            .get_connection_manager()
            .await
            .context("failed to connect to Redis")?;

        Ok(Self { conn })
    }

    /// Clone a connection handle for one logical operation
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Liveness probe for the health endpoint
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Redis PING failed")?;
        Ok(())
    }
}
