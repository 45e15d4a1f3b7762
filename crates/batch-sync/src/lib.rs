//! Resumable bulk backfill.
//!
//! A sync replays the field resolver over records that already exist in the
//! host (active members, active course enrolments) and delivers each one
//! directly through an [`EventSender`](event_outbox::EventSender). Work is
//! split into pages; every page is a scheduled `bento_bridge.sync_page` task
//! that persists its [`SyncProgress`] and schedules the next page until the
//! population is exhausted.
//!
//! Callers start a run with [`SyncEngine::start`] and poll
//! [`SyncEngine::status`] until it leaves [`SyncStatus::Running`].

mod engine;
mod error;
mod progress;
mod source;

pub use engine::{SyncEngine, SyncOptions, SYNC_PAGE_TASK};
pub use error::{SyncError, SyncResult};
pub use progress::{ProgressStore, SyncProgress, SyncStatus, SyncType};
pub use source::{RecordPage, RecordSource, SyncRecord};
