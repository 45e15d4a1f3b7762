//! Configuration, paths and logging setup for bento-bridge.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    BentoSettings, Config, SyncSettings, DEFAULT_API_URL, DEFAULT_LOG_LEVEL, DEFAULT_PACE_MS,
    DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_SECS,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
