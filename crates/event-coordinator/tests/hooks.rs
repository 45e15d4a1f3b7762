mod common;

use common::{Harness, Users};
use event_coordinator::{DispatchOutcome, MembershipOrder};
use mapping_rules::PayloadValue;
use serde_json::json;

fn all_enabled() -> serde_json::Value {
    let keys = mapping_rules::EVENT_DEFINITIONS.iter().map(|d| d.key);
    serde_json::Value::Object(keys.map(|k| (k.to_string(), json!({ "enabled": true }))).collect())
}

#[tokio::test]
async fn test_checkout_payload() {
    let harness = Harness::new(all_enabled(), Users::with(&[1]));
    let mut uow = harness.hooks.coordinator().begin();
    let order = MembershipOrder {
        user_id: 1,
        membership_id: 2,
        total: 19.5,
        payment_type: "PayPal".into(),
    };
    harness.hooks.checkout(&mut uow, &order).await.unwrap();
    harness.hooks.payment_completed(&mut uow, &order).await.unwrap();
    harness.hooks.payment_failed(&mut uow, &order).await.unwrap();
    harness.hooks.coordinator().flush(uow).await;
    harness.drain().await;

    let sent = harness.sender.sent.lock();
    let checkout = &sent[0].payload;
    assert_eq!(checkout["level_id"], PayloadValue::Int(2));
    assert_eq!(checkout["level_name"], PayloadValue::from("Gold"));
    assert_eq!(checkout["order_total"], PayloadValue::Float(19.5));
    assert_eq!(checkout["payment_type"], PayloadValue::from("PayPal"));

    assert_eq!(sent[1].output_event_name, "$PmproPaymentCompleted");
    assert_eq!(sent[1].payload.len(), 2);
    assert_eq!(sent[2].output_event_name, "$PmproPaymentFailed");
    assert_eq!(sent[2].payload["level_name"], PayloadValue::from("Gold"));
}

#[tokio::test]
async fn test_course_hooks() {
    let harness = Harness::new(all_enabled(), Users::with(&[3]));
    let hooks = &harness.hooks;
    let mut uow = hooks.coordinator().begin();

    hooks.enrolment_changed(&mut uow, 3, 10, true).await.unwrap();
    hooks.enrolment_changed(&mut uow, 3, 10, false).await.unwrap();
    hooks.course_started(&mut uow, 3, 10).await.unwrap();
    hooks.lesson_completed(&mut uow, 3, 100).await.unwrap();
    hooks.course_completed(&mut uow, 3, 11).await.unwrap();
    hooks.coordinator().flush(uow).await;
    harness.drain().await;

    assert_eq!(
        harness.sender.names(),
        [
            "$SenseiCourseEnrolled",
            "$SenseiCourseUnenrolled",
            "$SenseiCourseStarted",
            "$SenseiLessonCompleted",
            "$SenseiCourseCompleted",
        ]
    );

    let sent = harness.sender.sent.lock();
    assert_eq!(sent[0].payload["course_title"], PayloadValue::from("Intro to Baking"));
    assert_eq!(sent[3].payload["lesson_title"], PayloadValue::from("Sourdough Starters"));
    assert_eq!(sent[3].payload["course_id"], PayloadValue::Int(10));
    assert_eq!(sent[4].payload["course_title"], PayloadValue::from(""));
}

#[tokio::test]
async fn test_quiz_pass_flag_and_condition() {
    let settings = json!({
        "sensei_quiz_submitted": {
            "enabled": true,
            "custom_fields": [
                { "key": "quiz_result", "source_type": "static", "source_value": "passed",
                  "condition_key": "pass", "condition_value": "1" }
            ]
        }
    });
    let harness = Harness::new(settings, Users::with(&[8]));
    let hooks = &harness.hooks;
    let mut uow = hooks.coordinator().begin();

    let passed = hooks.quiz_submitted(&mut uow, 8, 7, 80.0, 80.0, "auto").await.unwrap();
    let failed = hooks.quiz_submitted(&mut uow, 8, 7, 79.5, 80.0, "auto").await.unwrap();
    assert!(matches!(passed, DispatchOutcome::Queued(_)));
    assert!(matches!(failed, DispatchOutcome::Queued(_)));
    harness.drain().await;

    let sent = harness.sender.sent.lock();
    assert_eq!(sent[0].payload["pass"], PayloadValue::Bool(true));
    assert_eq!(sent[0].attributes["quiz_result"], PayloadValue::from("passed"));
    assert_eq!(sent[1].payload["pass"], PayloadValue::Bool(false));
    assert!(sent[1].attributes.is_empty());
}

#[tokio::test]
async fn test_expiry_payload() {
    let harness = Harness::new(all_enabled(), Users::with(&[2]));
    let mut uow = harness.hooks.coordinator().begin();
    harness.hooks.membership_expired(&mut uow, 2, 1).await.unwrap();
    harness.drain().await;

    let sent = harness.sender.sent.lock();
    assert_eq!(sent[0].output_event_name, "$PmproMembershipExpired");
    assert_eq!(sent[0].payload["level_name"], PayloadValue::from("Bronze"));
}
