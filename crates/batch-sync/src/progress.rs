use crate::{SyncError, SyncResult};
use bridge_store::{KvStore, KvStoreExt, SYNC_STATUS_KEY};
use mapping_rules::catalog::{PMPRO_CHECKOUT, SENSEI_COURSE_ENROLLED};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Population a sync walks over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncType {
    /// Active members.
    #[serde(alias = "pmpro")]
    Primary,
    /// Active course enrolments.
    #[serde(alias = "sensei")]
    Secondary,
}

impl SyncType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncType::Primary => "primary",
            SyncType::Secondary => "secondary",
        }
    }

    /// Event type whose configuration resolves attributes for this
    /// population.
    pub fn representative_event(&self) -> &'static str {
        match self {
            SyncType::Primary => PMPRO_CHECKOUT,
            SyncType::Secondary => SENSEI_COURSE_ENROLLED,
        }
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "pmpro" => Ok(SyncType::Primary),
            "secondary" | "sensei" => Ok(SyncType::Secondary),
            other => Err(SyncError::UnknownSyncType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Running,
    Done,
    Error,
}

/// Persisted state of one sync type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub status: SyncStatus,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub offset: u64,
    /// Failed deliveries, summed over every page of the run.
    #[serde(default, rename = "errors")]
    pub error_count: u64,
    #[serde(default)]
    pub filter_id: u64,
    #[serde(default)]
    pub message: String,
}

impl SyncProgress {
    /// Returned for a type that was never started.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn queued(filter_id: u64) -> Self {
        Self {
            status: SyncStatus::Running,
            filter_id,
            message: "Queued - waiting for background processing to start...".to_string(),
            ..Self::default()
        }
    }

    pub fn running(total: u64, offset: u64, error_count: u64, filter_id: u64) -> Self {
        Self {
            status: SyncStatus::Running,
            total,
            offset,
            error_count,
            filter_id,
            message: format!("Synced {} of {}...{}", offset, total, failure_suffix(error_count)),
        }
    }

    pub fn done(total: u64, offset: u64, error_count: u64, filter_id: u64) -> Self {
        Self {
            status: SyncStatus::Done,
            total,
            offset,
            error_count,
            filter_id,
            message: format!("Done - synced {} records{}.", total, failure_suffix(error_count)),
        }
    }

    /// Run stopped; `reason` is shown to the caller as-is.
    pub fn failed(previous: &SyncProgress, reason: impl Into<String>) -> Self {
        Self {
            status: SyncStatus::Error,
            message: reason.into(),
            ..previous.clone()
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == SyncStatus::Running
    }
}

fn failure_suffix(error_count: u64) -> String {
    if error_count > 0 {
        format!(" ({} failed - check error log)", error_count)
    } else {
        String::new()
    }
}

/// Progress records for every sync type, kept as one map under
/// [`SYNC_STATUS_KEY`].
///
/// Updates are read-modify-write with no compare-and-swap; the last writer
/// wins.
#[derive(Clone)]
pub struct ProgressStore {
    store: Arc<dyn KvStore>,
}

impl ProgressStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn load(&self, sync_type: SyncType) -> SyncResult<SyncProgress> {
        Ok(self
            .load_all()?
            .remove(sync_type.as_str())
            .unwrap_or_else(SyncProgress::idle))
    }

    pub fn save(&self, sync_type: SyncType, progress: &SyncProgress) -> SyncResult<()> {
        let mut all = self.load_all()?;
        all.insert(sync_type.as_str().to_string(), progress.clone());
        self.store.set_json(SYNC_STATUS_KEY, &all)?;
        Ok(())
    }

    fn load_all(&self) -> SyncResult<BTreeMap<String, SyncProgress>> {
        Ok(self.store.get_json(SYNC_STATUS_KEY)?.unwrap_or_default())
    }
}
