#![allow(dead_code)]

use async_trait::async_trait;
use bridge_store::MemoryStore;
use event_coordinator::{ContentCatalog, EventCoordinator, HostHooks};
use event_outbox::{DeliveryError, DeliveryQueue, DeliveryResult, EventSender, ScheduleQueue, TaskScheduler};
use mapping_rules::{FieldResolver, ResolvedEvent, SettingsRepository, UserDirectory, UserId, UserIdentity};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<ResolvedEvent>>,
    pub fail: bool,
}

impl RecordingSender {
    pub fn names(&self) -> Vec<String> {
        self.sent.lock().iter().map(|e| e.output_event_name.clone()).collect()
    }
}

#[async_trait]
impl EventSender for RecordingSender {
    async fn send_event(&self, event: &ResolvedEvent) -> DeliveryResult<()> {
        self.sent.lock().push(event.clone());
        if self.fail {
            return Err(DeliveryError::Api {
                status: 503,
                message: "unavailable".into(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct Users {
    pub emails: HashMap<UserId, String>,
    pub attributes: HashMap<(UserId, String), String>,
}

impl Users {
    pub fn with(ids: &[UserId]) -> Self {
        let emails = ids.iter().map(|id| (*id, format!("user{}@example.com", id))).collect();
        Self {
            emails,
            ..Default::default()
        }
    }
}

impl UserDirectory for Users {
    fn identity(&self, user_id: UserId) -> Option<UserIdentity> {
        self.emails.get(&user_id).map(|email| UserIdentity {
            id: user_id,
            email: email.clone(),
        })
    }

    fn attribute(&self, user_id: UserId, name: &str) -> Option<String> {
        self.attributes.get(&(user_id, name.to_string())).cloned()
    }
}

pub struct Content;

impl ContentCatalog for Content {
    fn level_name(&self, level_id: i64) -> Option<String> {
        match level_id {
            1 => Some("Bronze".into()),
            2 => Some("Gold".into()),
            3 => Some("Platinum".into()),
            _ => None,
        }
    }

    fn course_title(&self, course_id: i64) -> Option<String> {
        (course_id == 10).then(|| "Intro to Baking".into())
    }

    fn lesson_title(&self, lesson_id: i64) -> Option<String> {
        (lesson_id == 100).then(|| "Sourdough Starters".into())
    }

    fn lesson_course(&self, lesson_id: i64) -> Option<i64> {
        (lesson_id == 100).then_some(10)
    }
}

pub struct Harness {
    pub hooks: HostHooks,
    pub sender: Arc<RecordingSender>,
    pub schedule: Arc<ScheduleQueue>,
    pub queue: DeliveryQueue,
}

impl Harness {
    /// Settings are imported through the sanitiser, as the settings page does.
    pub fn new(raw_settings: Value, users: Users) -> Self {
        Self::with_sender(raw_settings, users, RecordingSender::default())
    }

    pub fn with_sender(raw_settings: Value, users: Users, sender: RecordingSender) -> Self {
        let settings = SettingsRepository::new(Arc::new(MemoryStore::new()));
        settings.import(&raw_settings).unwrap();

        let resolver = FieldResolver::new(Arc::new(settings), Arc::new(users));
        let sender = Arc::new(sender);
        let schedule = Arc::new(ScheduleQueue::new());
        let scheduler: Arc<dyn TaskScheduler> = schedule.clone();
        let queue = DeliveryQueue::new(sender.clone(), Some(scheduler));
        let coordinator = EventCoordinator::new(resolver, queue.clone());

        Self {
            hooks: HostHooks::new(coordinator, Arc::new(Content)),
            sender,
            schedule,
            queue,
        }
    }

    /// Run every queued delivery task.
    pub async fn drain(&self) -> usize {
        self.schedule.run_until_idle(&self.queue, 100).await
    }
}
