#![allow(dead_code)]

use async_trait::async_trait;
use batch_sync::{RecordPage, RecordSource, SyncEngine, SyncError, SyncOptions, SyncRecord, SyncResult, SyncType};
use bridge_store::{KvStore, MemoryStore};
use event_outbox::{DeliveryError, DeliveryResult, EventSender, ScheduleQueue, TaskScheduler};
use mapping_rules::{FieldResolver, ResolvedEvent, SettingsRepository, UserDirectory, UserId, UserIdentity};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Records every attempt; fails for the listed users.
#[derive(Default)]
pub struct FlakySender {
    pub attempts: Mutex<Vec<ResolvedEvent>>,
    pub failing_users: HashSet<UserId>,
}

impl FlakySender {
    pub fn failing(users: &[UserId]) -> Self {
        Self {
            failing_users: users.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn attempted_users(&self) -> Vec<UserId> {
        self.attempts.lock().iter().map(|e| e.user_id).collect()
    }
}

#[async_trait]
impl EventSender for FlakySender {
    async fn send_event(&self, event: &ResolvedEvent) -> DeliveryResult<()> {
        self.attempts.lock().push(event.clone());
        if self.failing_users.contains(&event.user_id) {
            return Err(DeliveryError::Api {
                status: 500,
                message: "server error".into(),
            });
        }
        Ok(())
    }
}

/// Every id has an address except those listed in `without_email`.
#[derive(Default)]
pub struct Users {
    pub without_email: HashSet<UserId>,
}

impl UserDirectory for Users {
    fn identity(&self, user_id: UserId) -> Option<UserIdentity> {
        let email = if self.without_email.contains(&user_id) {
            String::new()
        } else {
            format!("member{}@example.com", user_id)
        };
        Some(UserIdentity { id: user_id, email })
    }

    fn attribute(&self, _user_id: UserId, _name: &str) -> Option<String> {
        None
    }
}

/// Members with ids `1..=count`, all on level 1 except every third on level 2.
///
/// Members listed in `orphaned` hold a level that no longer exists: their
/// rows count towards the page but produce no record.
pub struct VecSource {
    pub records: Mutex<Vec<(SyncRecord, u64)>>,
    pub orphaned: HashSet<UserId>,
    pub fail: Mutex<bool>,
}

impl VecSource {
    pub fn members(count: u64) -> Self {
        let records = (1..=count)
            .map(|id| {
                let level = if id % 3 == 0 { 2 } else { 1 };
                let name = if level == 2 { "Gold" } else { "Bronze" };
                (SyncRecord::membership(id, level, name), level as u64)
            })
            .collect();
        Self {
            records: Mutex::new(records),
            orphaned: HashSet::new(),
            fail: Mutex::new(false),
        }
    }

    pub fn with_orphaned(mut self, ids: &[UserId]) -> Self {
        self.orphaned = ids.iter().copied().collect();
        self
    }
}

impl RecordSource for VecSource {
    fn query_eligible(
        &self,
        sync_type: SyncType,
        filter_id: u64,
        offset: u64,
        limit: usize,
    ) -> SyncResult<RecordPage> {
        if *self.fail.lock() {
            return Err(SyncError::Source("Membership tables are not installed.".into()));
        }
        if sync_type != SyncType::Primary {
            return Ok(RecordPage::default());
        }

        let rows = self.records.lock();
        let eligible: Vec<&SyncRecord> = rows
            .iter()
            .filter(|(_, level)| filter_id == 0 || *level == filter_id)
            .map(|(record, _)| record)
            .collect();

        let (records, orphaned): (Vec<SyncRecord>, Vec<SyncRecord>) = eligible
            .iter()
            .skip(offset as usize)
            .take(limit)
            .map(|record| (*record).clone())
            .partition(|record| !self.orphaned.contains(&record.user_id));

        Ok(RecordPage {
            total: eligible.len() as u64,
            records,
            skipped: orphaned.len() as u64,
        })
    }
}

pub struct Harness {
    pub engine: Arc<SyncEngine>,
    pub sender: Arc<FlakySender>,
    pub source: Arc<VecSource>,
    pub schedule: Arc<ScheduleQueue>,
    pub store: Arc<dyn KvStore>,
}

impl Harness {
    pub fn new(settings: Value, users: Users, sender: FlakySender, source: VecSource, page_size: usize) -> Self {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        SettingsRepository::new(store.clone()).import(&settings).unwrap();

        let resolver = FieldResolver::new(Arc::new(SettingsRepository::new(store.clone())), Arc::new(users));
        let sender = Arc::new(sender);
        let source = Arc::new(source);
        let schedule = Arc::new(ScheduleQueue::new());
        let scheduler: Arc<dyn TaskScheduler> = schedule.clone();

        let engine = SyncEngine::new(store.clone(), resolver, sender.clone(), scheduler, source.clone())
            .with_options(SyncOptions {
                page_size,
                pace: Duration::ZERO,
            });

        Self {
            engine: Arc::new(engine),
            sender,
            source,
            schedule,
            store,
        }
    }

    /// Run queued pages until the chain ends.
    pub async fn drain(&self) -> usize {
        self.schedule.run_until_idle(self.engine.as_ref(), 1000).await
    }
}
