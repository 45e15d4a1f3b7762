use crate::{SyncResult, SyncType};
use mapping_rules::{EventPayload, PayloadValue, UserId};

/// One eligible record and the synthetic payload it is resolved with.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRecord {
    pub user_id: UserId,
    pub payload: EventPayload,
}

impl SyncRecord {
    /// Active membership. Historical records carry no order, so the order
    /// fields are zero and empty.
    pub fn membership(user_id: UserId, level_id: i64, level_name: &str) -> Self {
        let mut payload = EventPayload::new();
        payload.insert("level_id".into(), PayloadValue::Int(level_id));
        payload.insert("level_name".into(), PayloadValue::from(level_name));
        payload.insert("order_total".into(), PayloadValue::Int(0));
        payload.insert("payment_type".into(), PayloadValue::from(""));
        Self { user_id, payload }
    }

    pub fn enrolment(user_id: UserId, course_id: i64, course_title: &str) -> Self {
        let mut payload = EventPayload::new();
        payload.insert("course_id".into(), PayloadValue::Int(course_id));
        payload.insert("course_title".into(), PayloadValue::from(course_title));
        Self { user_id, payload }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPage {
    pub records: Vec<SyncRecord>,
    /// Size of the whole eligible population, not of this page.
    pub total: u64,
    /// Rows read for this page that cannot be turned into a record, such as
    /// a membership whose level no longer exists. They still move the offset.
    pub skipped: u64,
}

impl RecordPage {
    /// Rows this page consumed from the population.
    pub fn rows(&self) -> u64 {
        self.records.len() as u64 + self.skipped
    }
}

/// Population a sync walks over.
///
/// Records must come back in a stable order (ascending by an immutable id)
/// so that offsets stay meaningful across pages. `filter_id` 0 means no
/// filter.
pub trait RecordSource: Send + Sync {
    fn query_eligible(
        &self,
        sync_type: SyncType,
        filter_id: u64,
        offset: u64,
        limit: usize,
    ) -> SyncResult<RecordPage>;
}
