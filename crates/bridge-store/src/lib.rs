//! Key/value persistence for bento-bridge.
//!
//! Integration settings and sync progress are stored as JSON documents under
//! well-known keys. Two backends are provided:
//!
//! - [`SqliteStore`]: WAL-mode SQLite file with versioned migrations
//! - [`MemoryStore`]: process-local map, used by tests and dry runs
//!
//! Both are accessed through the [`KvStore`] trait so the rule and sync
//! engines never see the backend.

mod error;
mod memory;
mod migrations;
mod sqlite;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use migrations::CURRENT_VERSION;
pub use sqlite::SqliteStore;
pub use store::{KvStore, KvStoreExt, INTEGRATION_SETTINGS_KEY, SYNC_STATUS_KEY};
