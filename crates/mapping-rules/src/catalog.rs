//! Built-in event types.
//!
//! Each entry names the settings key, the output event name used when the
//! administrator has not chosen one, and the payload keys the host adapters
//! populate (handy as `event_data` sources and condition keys).

pub const PMPRO_CHECKOUT: &str = "pmpro_checkout";
pub const PMPRO_LEVEL_CHANGED: &str = "pmpro_level_changed";
pub const PMPRO_CANCELLED: &str = "pmpro_cancelled";
pub const PMPRO_PAYMENT_COMPLETED: &str = "pmpro_payment_completed";
pub const PMPRO_PAYMENT_FAILED: &str = "pmpro_payment_failed";
pub const PMPRO_EXPIRED: &str = "pmpro_expired";
pub const SENSEI_COURSE_ENROLLED: &str = "sensei_course_enrolled";
pub const SENSEI_COURSE_UNENROLLED: &str = "sensei_course_unenrolled";
pub const SENSEI_COURSE_STARTED: &str = "sensei_course_started";
pub const SENSEI_COURSE_COMPLETED: &str = "sensei_course_completed";
pub const SENSEI_LESSON_COMPLETED: &str = "sensei_lesson_completed";
pub const SENSEI_QUIZ_SUBMITTED: &str = "sensei_quiz_submitted";

/// Which host plugin an event originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
    Membership,
    Courses,
}

#[derive(Debug, Clone, Copy)]
pub struct EventDefinition {
    pub key: &'static str,
    pub label: &'static str,
    pub default_event: &'static str,
    pub description: &'static str,
    pub payload_keys: &'static [&'static str],
    pub integration: Integration,
}

pub const EVENT_DEFINITIONS: &[EventDefinition] = &[
    EventDefinition {
        key: PMPRO_CHECKOUT,
        label: "Membership: Member Checkout",
        default_event: "$PmproMemberCheckout",
        description: "A member completes checkout (new signup or renewal).",
        payload_keys: &["level_id", "level_name", "order_total", "payment_type"],
        integration: Integration::Membership,
    },
    EventDefinition {
        key: PMPRO_LEVEL_CHANGED,
        label: "Membership: Level Changed",
        default_event: "$PmproLevelChanged",
        description: "A member's active membership level changes.",
        payload_keys: &["level_id", "new_level_name", "old_level_names"],
        integration: Integration::Membership,
    },
    EventDefinition {
        key: PMPRO_CANCELLED,
        label: "Membership: Cancelled",
        default_event: "$PmproCancelled",
        description: "A member cancels their membership.",
        payload_keys: &["last_level_names"],
        integration: Integration::Membership,
    },
    EventDefinition {
        key: PMPRO_PAYMENT_COMPLETED,
        label: "Membership: Recurring Payment Completed",
        default_event: "$PmproPaymentCompleted",
        description: "A recurring subscription payment succeeds.",
        payload_keys: &["order_total", "level_name"],
        integration: Integration::Membership,
    },
    EventDefinition {
        key: PMPRO_PAYMENT_FAILED,
        label: "Membership: Recurring Payment Failed",
        default_event: "$PmproPaymentFailed",
        description: "A recurring subscription payment fails.",
        payload_keys: &["level_name"],
        integration: Integration::Membership,
    },
    EventDefinition {
        key: PMPRO_EXPIRED,
        label: "Membership: Expired",
        default_event: "$PmproMembershipExpired",
        description: "A membership expires.",
        payload_keys: &["level_id", "level_name"],
        integration: Integration::Membership,
    },
    EventDefinition {
        key: SENSEI_COURSE_ENROLLED,
        label: "Courses: Enrolled",
        default_event: "$SenseiCourseEnrolled",
        description: "A student is enrolled in a course.",
        payload_keys: &["course_id", "course_title"],
        integration: Integration::Courses,
    },
    EventDefinition {
        key: SENSEI_COURSE_UNENROLLED,
        label: "Courses: Unenrolled",
        default_event: "$SenseiCourseUnenrolled",
        description: "A student is unenrolled from a course.",
        payload_keys: &["course_id", "course_title"],
        integration: Integration::Courses,
    },
    EventDefinition {
        key: SENSEI_COURSE_STARTED,
        label: "Courses: Course Started",
        default_event: "$SenseiCourseStarted",
        description: "A student starts working through a course.",
        payload_keys: &["course_id", "course_title"],
        integration: Integration::Courses,
    },
    EventDefinition {
        key: SENSEI_COURSE_COMPLETED,
        label: "Courses: Course Completed",
        default_event: "$SenseiCourseCompleted",
        description: "A student completes all lessons in a course.",
        payload_keys: &["course_id", "course_title"],
        integration: Integration::Courses,
    },
    EventDefinition {
        key: SENSEI_LESSON_COMPLETED,
        label: "Courses: Lesson Completed",
        default_event: "$SenseiLessonCompleted",
        description: "A student completes a lesson.",
        payload_keys: &["lesson_id", "lesson_title", "course_id"],
        integration: Integration::Courses,
    },
    EventDefinition {
        key: SENSEI_QUIZ_SUBMITTED,
        label: "Courses: Quiz Submitted",
        default_event: "$SenseiQuizSubmitted",
        description: "A student submits a quiz.",
        payload_keys: &[
            "quiz_id",
            "grade",
            "pass",
            "quiz_pass_percentage",
            "quiz_grade_type",
        ],
        integration: Integration::Courses,
    },
];

pub fn find(key: &str) -> Option<&'static EventDefinition> {
    EVENT_DEFINITIONS.iter().find(|def| def.key == key)
}

/// Default output name; unknown keys fall back to the key itself.
pub fn default_event_name(key: &str) -> String {
    find(key)
        .map(|def| def.default_event.to_string())
        .unwrap_or_else(|| key.to_string())
}
