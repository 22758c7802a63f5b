use thiserror::Error;
use uuid::Uuid;

/// Dispatch error taxonomy.
///
/// `NotCurrentOfferee` and `AlreadyResolved` are request-shaped: the caller
/// maps them to `applied = false` / 4xx. `Store` is infrastructure: no state
/// is assumed changed and callers may retry idempotently.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("driver {driver} is not the current offeree for request {request_id}")]
    NotCurrentOfferee { request_id: Uuid, driver: String },

    #[error("request {0} has already been resolved")]
    AlreadyResolved(Uuid),

    #[error("ride request {0} not found")]
    RequestNotFound(Uuid),

    #[error("coordinator unavailable: {0}")]
    Store(#[from] anyhow::Error),
}
