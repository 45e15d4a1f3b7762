use bridge_store::StoreError;
use mapping_rules::RulesError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Rules error: {0}")]
    Rules(#[from] RulesError),

    #[error("Scheduling error: {0}")]
    Schedule(#[from] event_outbox::DeliveryError),

    #[error("Unknown sync type: {0}")]
    UnknownSyncType(String),

    /// The record source could not be queried.
    #[error("{0}")]
    Source(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
