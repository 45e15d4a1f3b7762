use crate::{ProgressStore, RecordSource, SyncProgress, SyncResult, SyncType};
use async_trait::async_trait;
use bridge_store::KvStore;
use chrono::Utc;
use event_outbox::{DeliveryError, DeliveryResult, EventSender, ScheduledTask, TaskHandle, TaskHandler, TaskScheduler};
use mapping_rules::{FieldResolver, ResolvedEvent};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Task name for one page of a sync run.
pub const SYNC_PAGE_TASK: &str = "bento_bridge.sync_page";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub page_size: usize,
    /// Pause after every delivery attempt, to stay under API rate limits.
    pub pace: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: 25,
            pace: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PageArgs {
    #[serde(rename = "type")]
    sync_type: SyncType,
    #[serde(default)]
    offset: u64,
    #[serde(default)]
    filter_id: u64,
}

/// Drives paged backfills.
///
/// Records bypass the coordinator and the delivery queue: each page sends
/// its records directly so failures can be counted per record.
pub struct SyncEngine {
    progress: ProgressStore,
    resolver: FieldResolver,
    sender: Arc<dyn EventSender>,
    scheduler: Arc<dyn TaskScheduler>,
    source: Arc<dyn RecordSource>,
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn KvStore>,
        resolver: FieldResolver,
        sender: Arc<dyn EventSender>,
        scheduler: Arc<dyn TaskScheduler>,
        source: Arc<dyn RecordSource>,
    ) -> Self {
        Self {
            progress: ProgressStore::new(store),
            resolver,
            sender,
            scheduler,
            source,
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Begin a fresh run, replacing any queued page of the same type.
    pub fn start(&self, sync_type: SyncType, filter_id: u64) -> SyncResult<TaskHandle> {
        let cancelled = self
            .scheduler
            .cancel(SYNC_PAGE_TASK, &json!({ "type": sync_type.as_str() }));
        if cancelled > 0 {
            debug!(sync_type = %sync_type, cancelled, "Cancelled pending sync pages");
        }

        self.progress.save(sync_type, &SyncProgress::queued(filter_id))?;
        let handle = self.schedule_page(sync_type, 0, filter_id)?;

        info!(sync_type = %sync_type, filter_id, "Sync queued");
        Ok(handle)
    }

    pub fn status(&self, sync_type: SyncType) -> SyncResult<SyncProgress> {
        self.progress.load(sync_type)
    }

    /// Process one page and persist the new progress. Schedules the
    /// following page unless the run is finished.
    ///
    /// Any failure inside the page ends the run as [`SyncStatus::Error`]
    /// with the error text as its message. Only a failure to record that
    /// state is returned as an error.
    ///
    /// [`SyncStatus::Error`]: crate::SyncStatus::Error
    pub async fn run_page(&self, sync_type: SyncType, offset: u64, filter_id: u64) -> SyncResult<SyncProgress> {
        match self.process_page(sync_type, offset, filter_id).await {
            Ok(progress) => Ok(progress),
            Err(e) => {
                error!(sync_type = %sync_type, offset, error = %e, "Sync page failed, stopping sync");
                let previous = self.progress.load(sync_type).unwrap_or_else(|_| SyncProgress {
                    filter_id,
                    ..SyncProgress::idle()
                });
                let failed = SyncProgress::failed(&previous, e.to_string());
                if let Err(save_err) = self.progress.save(sync_type, &failed) {
                    warn!(sync_type = %sync_type, error = %save_err, "Could not record sync failure");
                    return Err(e);
                }
                Ok(failed)
            }
        }
    }

    async fn process_page(&self, sync_type: SyncType, offset: u64, filter_id: u64) -> SyncResult<SyncProgress> {
        let previous = self.progress.load(sync_type)?;
        let page = self
            .source
            .query_eligible(sync_type, filter_id, offset, self.options.page_size)?;
        if page.skipped > 0 {
            debug!(sync_type = %sync_type, offset, skipped = page.skipped, "Rows without a record, skipping");
        }

        let event_key = sync_type.representative_event();
        let config = self.resolver.config_for(event_key)?;
        let mut page_errors = 0;

        for record in &page.records {
            let Some(identity) = self.resolver.deliverable_identity(record.user_id) else {
                debug!(sync_type = %sync_type, user_id = record.user_id, "No deliverable identity, skipping");
                continue;
            };

            let fields = self.resolver.apply(&config, record.user_id, &record.payload);
            if fields.output_event_name.is_empty() {
                debug!(sync_type = %sync_type, user_id = record.user_id, "Empty output event name, skipping");
                continue;
            }

            let event = ResolvedEvent::new(&identity, fields, record.payload.clone());
            if let Err(e) = self.sender.send_event(&event).await {
                page_errors += 1;
                warn!(
                    sync_type = %sync_type,
                    user_id = record.user_id,
                    event_key,
                    error = %e,
                    "Sync delivery failed"
                );
            }

            if !self.options.pace.is_zero() {
                tokio::time::sleep(self.options.pace).await;
            }
        }

        // Page 0 starts a run; later pages add to what earlier pages counted.
        let carried_errors = if offset == 0 { 0 } else { previous.error_count };
        let error_count = carried_errors + page_errors;
        let new_offset = offset + page.rows();
        // An empty page ends the run even if the population shrank under us.
        let done = new_offset >= page.total || page.rows() == 0;

        let progress = if done {
            SyncProgress::done(page.total, new_offset, error_count, filter_id)
        } else {
            SyncProgress::running(page.total, new_offset, error_count, filter_id)
        };
        self.progress.save(sync_type, &progress)?;

        if !done {
            self.schedule_page(sync_type, new_offset, filter_id)?;
        }

        info!(
            sync_type = %sync_type,
            offset = new_offset,
            total = page.total,
            errors = error_count,
            done,
            "Sync page processed"
        );
        Ok(progress)
    }

    fn schedule_page(&self, sync_type: SyncType, offset: u64, filter_id: u64) -> SyncResult<TaskHandle> {
        let args = serde_json::to_value(PageArgs {
            sync_type,
            offset,
            filter_id,
        })
        .map_err(DeliveryError::from)?;
        Ok(self.scheduler.schedule(SYNC_PAGE_TASK, args, Utc::now())?)
    }
}

#[async_trait]
impl TaskHandler for SyncEngine {
    async fn run(&self, task: &ScheduledTask) -> DeliveryResult<()> {
        let args: PageArgs = serde_json::from_value(task.args.clone())
            .map_err(|e| DeliveryError::InvalidArgs(e.to_string()))?;
        self.run_page(args.sync_type, args.offset, args.filter_id)
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError::Task(e.to_string()))
    }
}
