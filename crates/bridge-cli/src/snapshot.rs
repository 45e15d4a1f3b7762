//! Host data loaded from a JSON snapshot.
//!
//! Stands in for the host application: users and their meta, membership
//! levels, courses, lessons, and the membership/enrolment tables the bulk
//! sync walks over.

use anyhow::{Context, Result};
use batch_sync::{RecordPage, RecordSource, SyncRecord, SyncResult, SyncType};
use event_coordinator::ContentCatalog;
use mapping_rules::{UserDirectory, UserId, UserIdentity};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotUser {
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub meta: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotLevel {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotCourse {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotLesson {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub course_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotMembership {
    pub user_id: UserId,
    pub level_id: i64,
    #[serde(default = "active")]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotEnrolment {
    pub user_id: UserId,
    pub course_id: i64,
    #[serde(default = "in_progress")]
    pub status: String,
}

fn active() -> String {
    "active".to_string()
}

fn in_progress() -> String {
    "in-progress".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<SnapshotUser>,
    #[serde(default)]
    pub levels: Vec<SnapshotLevel>,
    #[serde(default)]
    pub courses: Vec<SnapshotCourse>,
    #[serde(default)]
    pub lessons: Vec<SnapshotLesson>,
    #[serde(default)]
    pub memberships: Vec<SnapshotMembership>,
    #[serde(default)]
    pub enrolments: Vec<SnapshotEnrolment>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid snapshot {}", path.display()))
    }

    fn user(&self, user_id: UserId) -> Option<&SnapshotUser> {
        self.users.iter().find(|u| u.id == user_id)
    }

    /// Active memberships, one per (user, level), ordered by user id.
    fn active_memberships(&self, filter_id: u64) -> Vec<(UserId, i64)> {
        self.memberships
            .iter()
            .filter(|m| m.status == "active")
            .filter(|m| filter_id == 0 || m.level_id == filter_id as i64)
            .map(|m| (m.user_id, m.level_id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// In-progress or completed enrolments, ordered by user then course.
    fn active_enrolments(&self, filter_id: u64) -> Vec<(UserId, i64)> {
        self.enrolments
            .iter()
            .filter(|e| e.status == "in-progress" || e.status == "complete")
            .filter(|e| filter_id == 0 || e.course_id == filter_id as i64)
            .map(|e| (e.user_id, e.course_id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl UserDirectory for Snapshot {
    fn identity(&self, user_id: UserId) -> Option<UserIdentity> {
        self.user(user_id).map(|u| UserIdentity {
            id: u.id,
            email: u.email.clone(),
        })
    }

    fn attribute(&self, user_id: UserId, name: &str) -> Option<String> {
        self.user(user_id)?.meta.get(name).cloned()
    }
}

impl ContentCatalog for Snapshot {
    fn level_name(&self, level_id: i64) -> Option<String> {
        self.levels.iter().find(|l| l.id == level_id).map(|l| l.name.clone())
    }

    fn course_title(&self, course_id: i64) -> Option<String> {
        self.courses.iter().find(|c| c.id == course_id).map(|c| c.title.clone())
    }

    fn lesson_title(&self, lesson_id: i64) -> Option<String> {
        self.lessons.iter().find(|l| l.id == lesson_id).map(|l| l.title.clone())
    }

    fn lesson_course(&self, lesson_id: i64) -> Option<i64> {
        self.lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .map(|l| l.course_id)
            .filter(|id| *id > 0)
    }
}

impl RecordSource for Snapshot {
    fn query_eligible(
        &self,
        sync_type: SyncType,
        filter_id: u64,
        offset: u64,
        limit: usize,
    ) -> SyncResult<RecordPage> {
        let rows = match sync_type {
            SyncType::Primary => self.active_memberships(filter_id),
            SyncType::Secondary => self.active_enrolments(filter_id),
        };
        let total = rows.len() as u64;

        let page: Vec<(UserId, i64)> = rows.into_iter().skip(offset as usize).take(limit).collect();
        let mut records = Vec::with_capacity(page.len());
        for (user_id, id) in &page {
            match sync_type {
                // A membership whose level was deleted is not synced.
                SyncType::Primary => {
                    if let Some(name) = self.level_name(*id) {
                        records.push(SyncRecord::membership(*user_id, *id, &name));
                    }
                }
                SyncType::Secondary => records.push(SyncRecord::enrolment(
                    *user_id,
                    *id,
                    &self.course_title(*id).unwrap_or_default(),
                )),
            }
        }

        Ok(RecordPage {
            skipped: (page.len() - records.len()) as u64,
            records,
            total,
        })
    }
}
