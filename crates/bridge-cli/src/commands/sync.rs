//! Bulk sync commands.

use crate::app::App;
use crate::output::{print_heading, print_row};
use crate::snapshot::Snapshot;
use anyhow::{bail, Result};
use batch_sync::{ProgressStore, SyncEngine, SyncStatus, SyncType, SYNC_PAGE_TASK};
use event_outbox::{ScheduleQueue, TaskRouter, TaskScheduler};
use std::path::Path;
use std::sync::Arc;

/// Start a sync and drive its page chain to the end, printing progress
/// after every page.
pub async fn sync_start(app: &App, snapshot: &Path, sync_type: &str, filter_id: u64) -> Result<()> {
    let sync_type: SyncType = sync_type.parse()?;
    let snapshot = Arc::new(Snapshot::load(snapshot)?);

    let schedule = Arc::new(ScheduleQueue::new());
    let scheduler: Arc<dyn TaskScheduler> = schedule.clone();
    let engine = Arc::new(
        SyncEngine::new(
            app.store.clone(),
            app.resolver(snapshot.clone()),
            app.sender()?,
            scheduler,
            snapshot,
        )
        .with_options(app.sync_options()),
    );

    let router = TaskRouter::new();
    router.register(SYNC_PAGE_TASK, engine.clone());

    engine.start(sync_type, filter_id)?;
    println!("{}", engine.status(sync_type)?.message);

    while schedule.run_until_idle(&router, 1).await > 0 {
        println!("{}", engine.status(sync_type)?.message);
    }

    let progress = engine.status(sync_type)?;
    match progress.status {
        SyncStatus::Error => bail!("Sync failed: {}", progress.message),
        SyncStatus::Running => bail!(
            "Sync stopped at {} of {} with no page left to run",
            progress.offset,
            progress.total
        ),
        SyncStatus::Idle | SyncStatus::Done => Ok(()),
    }
}

pub fn sync_status(app: &App, sync_type: &str) -> Result<()> {
    let sync_type: SyncType = sync_type.parse()?;
    let progress = ProgressStore::new(app.store.clone()).load(sync_type)?;

    print_heading(&format!("Sync status ({})", sync_type));
    print_row("Status", format!("{:?}", progress.status).to_lowercase());
    print_row("Progress", format!("{} / {}", progress.offset, progress.total));
    print_row("Failed", progress.error_count);
    if progress.filter_id > 0 {
        print_row("Filter", progress.filter_id);
    }
    if !progress.message.is_empty() {
        print_row("Message", &progress.message);
    }
    Ok(())
}
