//! Host callback adapters.
//!
//! Each method turns one host callback into a catalog event payload and
//! forwards it to the [`EventCoordinator`]. Titles and level names are looked
//! up through [`ContentCatalog`]; lookups that miss produce empty strings.

use crate::{CoordinatorResult, DispatchOutcome, EventCoordinator, FlushReport, UnitOfWork};
use mapping_rules::catalog::{
    PMPRO_CHECKOUT, PMPRO_EXPIRED, PMPRO_LEVEL_CHANGED, PMPRO_PAYMENT_COMPLETED, PMPRO_PAYMENT_FAILED,
    SENSEI_COURSE_COMPLETED, SENSEI_COURSE_ENROLLED, SENSEI_COURSE_STARTED, SENSEI_COURSE_UNENROLLED,
    SENSEI_LESSON_COMPLETED, SENSEI_QUIZ_SUBMITTED,
};
use mapping_rules::{EventPayload, PayloadValue, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

/// Names and titles of host content.
pub trait ContentCatalog: Send + Sync {
    fn level_name(&self, level_id: i64) -> Option<String>;
    fn course_title(&self, course_id: i64) -> Option<String>;
    fn lesson_title(&self, lesson_id: i64) -> Option<String>;
    /// Course a lesson belongs to.
    fn lesson_course(&self, lesson_id: i64) -> Option<i64>;
}

/// The slice of a membership order the adapters read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipOrder {
    pub user_id: UserId,
    pub membership_id: i64,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub payment_type: String,
}

/// Serialised host callback, as replayed from a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "hook", rename_all = "snake_case")]
pub enum HostNotification {
    BeforeLevelChange {
        user_id: UserId,
        #[serde(default)]
        old_level_ids: Vec<i64>,
    },
    Checkout(MembershipOrder),
    LevelChanged {
        user_id: UserId,
        level_id: i64,
    },
    PaymentCompleted(MembershipOrder),
    PaymentFailed(MembershipOrder),
    MembershipExpired {
        user_id: UserId,
        level_id: i64,
    },
    EnrolmentChanged {
        user_id: UserId,
        course_id: i64,
        enrolled: bool,
    },
    CourseStarted {
        user_id: UserId,
        course_id: i64,
    },
    CourseCompleted {
        user_id: UserId,
        course_id: i64,
    },
    LessonCompleted {
        user_id: UserId,
        lesson_id: i64,
    },
    QuizSubmitted {
        user_id: UserId,
        quiz_id: i64,
        grade: f64,
        #[serde(default)]
        quiz_pass_percentage: f64,
        #[serde(default)]
        quiz_grade_type: String,
    },
}

impl HostNotification {
    pub fn user_id(&self) -> UserId {
        match self {
            HostNotification::Checkout(order)
            | HostNotification::PaymentCompleted(order)
            | HostNotification::PaymentFailed(order) => order.user_id,
            HostNotification::BeforeLevelChange { user_id, .. }
            | HostNotification::LevelChanged { user_id, .. }
            | HostNotification::MembershipExpired { user_id, .. }
            | HostNotification::EnrolmentChanged { user_id, .. }
            | HostNotification::CourseStarted { user_id, .. }
            | HostNotification::CourseCompleted { user_id, .. }
            | HostNotification::LessonCompleted { user_id, .. }
            | HostNotification::QuizSubmitted { user_id, .. } => *user_id,
        }
    }

    /// Run this callback against `hooks`. The pre-change capture never
    /// dispatches and reports [`DispatchOutcome::Deferred`].
    pub async fn apply(&self, hooks: &HostHooks, uow: &mut UnitOfWork) -> CoordinatorResult<DispatchOutcome> {
        match self {
            HostNotification::BeforeLevelChange { user_id, old_level_ids } => {
                hooks.before_level_change(uow, *user_id, old_level_ids);
                Ok(DispatchOutcome::Deferred)
            }
            HostNotification::Checkout(order) => hooks.checkout(uow, order).await,
            HostNotification::LevelChanged { user_id, level_id } => {
                hooks.level_changed(uow, *level_id, *user_id).await
            }
            HostNotification::PaymentCompleted(order) => hooks.payment_completed(uow, order).await,
            HostNotification::PaymentFailed(order) => hooks.payment_failed(uow, order).await,
            HostNotification::MembershipExpired { user_id, level_id } => {
                hooks.membership_expired(uow, *user_id, *level_id).await
            }
            HostNotification::EnrolmentChanged {
                user_id,
                course_id,
                enrolled,
            } => hooks.enrolment_changed(uow, *user_id, *course_id, *enrolled).await,
            HostNotification::CourseStarted { user_id, course_id } => {
                hooks.course_started(uow, *user_id, *course_id).await
            }
            HostNotification::CourseCompleted { user_id, course_id } => {
                hooks.course_completed(uow, *user_id, *course_id).await
            }
            HostNotification::LessonCompleted { user_id, lesson_id } => {
                hooks.lesson_completed(uow, *user_id, *lesson_id).await
            }
            HostNotification::QuizSubmitted {
                user_id,
                quiz_id,
                grade,
                quiz_pass_percentage,
                quiz_grade_type,
            } => {
                hooks
                    .quiz_submitted(uow, *user_id, *quiz_id, *grade, *quiz_pass_percentage, quiz_grade_type)
                    .await
            }
        }
    }
}

#[derive(Clone)]
pub struct HostHooks {
    coordinator: EventCoordinator,
    catalog: Arc<dyn ContentCatalog>,
}

impl HostHooks {
    pub fn new(coordinator: EventCoordinator, catalog: Arc<dyn ContentCatalog>) -> Self {
        Self { coordinator, catalog }
    }

    pub fn coordinator(&self) -> &EventCoordinator {
        &self.coordinator
    }

    /// Run a whole host operation: begin, apply every callback in order,
    /// flush once. Per-callback errors are logged and counted as failed.
    pub async fn run_unit_of_work(&self, notifications: &[HostNotification]) -> FlushReport {
        let mut uow = self.coordinator.begin();
        let mut failed = 0;

        for notification in notifications {
            match notification.apply(self, &mut uow).await {
                Ok(outcome) => debug!(
                    user_id = notification.user_id(),
                    outcome = ?outcome,
                    "Host notification applied"
                ),
                Err(e) => {
                    error!(user_id = notification.user_id(), error = %e, "Host notification failed");
                    failed += 1;
                }
            }
        }

        let mut report = self.coordinator.flush(uow).await;
        report.failed += failed;
        report
    }

    /// Pre-change capture: remember the names of the levels the user holds
    /// right now.
    pub fn before_level_change(&self, uow: &mut UnitOfWork, user_id: UserId, old_level_ids: &[i64]) {
        let names = old_level_ids
            .iter()
            .filter_map(|id| self.catalog.level_name(*id))
            .collect();
        self.coordinator.capture_old_levels(uow, user_id, names);
    }

    pub async fn checkout(&self, uow: &mut UnitOfWork, order: &MembershipOrder) -> CoordinatorResult<DispatchOutcome> {
        let mut payload = EventPayload::new();
        payload.insert("level_id".into(), PayloadValue::Int(order.membership_id));
        payload.insert("level_name".into(), self.level_name(order.membership_id));
        payload.insert("order_total".into(), PayloadValue::Float(order.total));
        payload.insert("payment_type".into(), PayloadValue::from(order.payment_type.as_str()));
        self.coordinator.notify(uow, PMPRO_CHECKOUT, order.user_id, payload).await
    }

    /// `level_id <= 0` means the user lost all levels.
    pub async fn level_changed(
        &self,
        uow: &mut UnitOfWork,
        level_id: i64,
        user_id: UserId,
    ) -> CoordinatorResult<DispatchOutcome> {
        let mut payload = EventPayload::new();
        payload.insert("level_id".into(), PayloadValue::Int(level_id));
        payload.insert("new_level_name".into(), self.level_name(level_id));
        self.coordinator.notify(uow, PMPRO_LEVEL_CHANGED, user_id, payload).await
    }

    pub async fn payment_completed(
        &self,
        uow: &mut UnitOfWork,
        order: &MembershipOrder,
    ) -> CoordinatorResult<DispatchOutcome> {
        let mut payload = EventPayload::new();
        payload.insert("order_total".into(), PayloadValue::Float(order.total));
        payload.insert("level_name".into(), self.level_name(order.membership_id));
        self.coordinator.notify(uow, PMPRO_PAYMENT_COMPLETED, order.user_id, payload).await
    }

    pub async fn payment_failed(
        &self,
        uow: &mut UnitOfWork,
        order: &MembershipOrder,
    ) -> CoordinatorResult<DispatchOutcome> {
        let mut payload = EventPayload::new();
        payload.insert("level_name".into(), self.level_name(order.membership_id));
        self.coordinator.notify(uow, PMPRO_PAYMENT_FAILED, order.user_id, payload).await
    }

    pub async fn membership_expired(
        &self,
        uow: &mut UnitOfWork,
        user_id: UserId,
        level_id: i64,
    ) -> CoordinatorResult<DispatchOutcome> {
        let mut payload = EventPayload::new();
        payload.insert("level_id".into(), PayloadValue::Int(level_id));
        payload.insert("level_name".into(), self.level_name(level_id));
        self.coordinator.notify(uow, PMPRO_EXPIRED, user_id, payload).await
    }

    pub async fn enrolment_changed(
        &self,
        uow: &mut UnitOfWork,
        user_id: UserId,
        course_id: i64,
        enrolled: bool,
    ) -> CoordinatorResult<DispatchOutcome> {
        let key = if enrolled {
            SENSEI_COURSE_ENROLLED
        } else {
            SENSEI_COURSE_UNENROLLED
        };
        self.coordinator
            .notify(uow, key, user_id, self.course_payload(course_id))
            .await
    }

    pub async fn course_started(
        &self,
        uow: &mut UnitOfWork,
        user_id: UserId,
        course_id: i64,
    ) -> CoordinatorResult<DispatchOutcome> {
        self.coordinator
            .notify(uow, SENSEI_COURSE_STARTED, user_id, self.course_payload(course_id))
            .await
    }

    pub async fn course_completed(
        &self,
        uow: &mut UnitOfWork,
        user_id: UserId,
        course_id: i64,
    ) -> CoordinatorResult<DispatchOutcome> {
        self.coordinator
            .notify(uow, SENSEI_COURSE_COMPLETED, user_id, self.course_payload(course_id))
            .await
    }

    pub async fn lesson_completed(
        &self,
        uow: &mut UnitOfWork,
        user_id: UserId,
        lesson_id: i64,
    ) -> CoordinatorResult<DispatchOutcome> {
        let mut payload = EventPayload::new();
        payload.insert("lesson_id".into(), PayloadValue::Int(lesson_id));
        payload.insert(
            "lesson_title".into(),
            PayloadValue::Text(self.catalog.lesson_title(lesson_id).unwrap_or_default()),
        );
        payload.insert(
            "course_id".into(),
            PayloadValue::Int(self.catalog.lesson_course(lesson_id).unwrap_or(0)),
        );
        self.coordinator
            .notify(uow, SENSEI_LESSON_COMPLETED, user_id, payload)
            .await
    }

    pub async fn quiz_submitted(
        &self,
        uow: &mut UnitOfWork,
        user_id: UserId,
        quiz_id: i64,
        grade: f64,
        pass_percentage: f64,
        grade_type: &str,
    ) -> CoordinatorResult<DispatchOutcome> {
        let mut payload = EventPayload::new();
        payload.insert("quiz_id".into(), PayloadValue::Int(quiz_id));
        payload.insert("grade".into(), PayloadValue::Float(grade));
        payload.insert("pass".into(), PayloadValue::Bool(grade >= pass_percentage));
        payload.insert("quiz_pass_percentage".into(), PayloadValue::Float(pass_percentage));
        payload.insert("quiz_grade_type".into(), PayloadValue::from(grade_type));
        self.coordinator
            .notify(uow, SENSEI_QUIZ_SUBMITTED, user_id, payload)
            .await
    }

    fn level_name(&self, level_id: i64) -> PayloadValue {
        PayloadValue::Text(self.catalog.level_name(level_id).unwrap_or_default())
    }

    fn course_payload(&self, course_id: i64) -> EventPayload {
        let mut payload = EventPayload::new();
        payload.insert("course_id".into(), PayloadValue::Int(course_id));
        payload.insert(
            "course_title".into(),
            PayloadValue::Text(self.catalog.course_title(course_id).unwrap_or_default()),
        );
        payload
    }
}
