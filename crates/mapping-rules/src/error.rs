use bridge_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

pub type RulesResult<T> = Result<T, RulesError>;
