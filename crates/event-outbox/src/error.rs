//! Delivery error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the API.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Missing API credentials")]
    MissingCredentials,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid task arguments: {0}")]
    InvalidArgs(String),

    #[error("No handler registered for task {0}")]
    UnknownTask(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// A handler failed for reasons outside delivery itself.
    #[error("Task failed: {0}")]
    Task(String),
}

impl DeliveryError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            DeliveryError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            DeliveryError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

pub type DeliveryResult<T> = Result<T, DeliveryError>;
