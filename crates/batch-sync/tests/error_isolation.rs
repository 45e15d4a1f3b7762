mod common;

use batch_sync::{SyncStatus, SyncType};
use common::{FlakySender, Harness, Users, VecSource};
use serde_json::json;

fn settings() -> serde_json::Value {
    json!({ "pmpro_checkout": { "enabled": true } })
}

#[tokio::test]
async fn test_failed_record_does_not_stop_page() {
    let harness = Harness::new(
        settings(),
        Users::default(),
        FlakySender::failing(&[2, 4]),
        VecSource::members(6),
        25,
    );

    let progress = harness.engine.run_page(SyncType::Primary, 0, 0).await.unwrap();
    assert_eq!(harness.sender.attempted_users(), [1, 2, 3, 4, 5, 6]);
    assert_eq!(progress.error_count, 2);
    assert_eq!(progress.status, SyncStatus::Done);
    assert_eq!(progress.message, "Done - synced 6 records (2 failed - check error log).");
}

#[tokio::test]
async fn test_error_count_accumulates_across_pages() {
    let harness = Harness::new(
        settings(),
        Users::default(),
        FlakySender::failing(&[1, 7, 8]),
        VecSource::members(10),
        5,
    );

    let first = harness.engine.run_page(SyncType::Primary, 0, 0).await.unwrap();
    assert_eq!(first.error_count, 1);
    assert_eq!(first.message, "Synced 5 of 10... (1 failed - check error log)");

    harness.drain().await;
    let done = harness.engine.status(SyncType::Primary).unwrap();
    assert_eq!(done.error_count, 3);
    assert_eq!(done.status, SyncStatus::Done);
}

#[tokio::test]
async fn test_missing_identity_is_not_an_error() {
    let users = Users {
        without_email: [3].into_iter().collect(),
    };
    let harness = Harness::new(settings(), users, FlakySender::default(), VecSource::members(4), 25);

    let progress = harness.engine.run_page(SyncType::Primary, 0, 0).await.unwrap();
    assert_eq!(harness.sender.attempted_users(), [1, 2, 4]);
    assert_eq!(progress.error_count, 0);
    assert_eq!(progress.offset, 4);
}

#[tokio::test]
async fn test_unnamed_event_skips_delivery() {
    let settings = json!({ "pmpro_checkout": { "enabled": true, "event_name": "" } });
    let harness = Harness::new(settings, Users::default(), FlakySender::default(), VecSource::members(3), 25);

    let progress = harness.engine.run_page(SyncType::Primary, 0, 0).await.unwrap();
    assert!(harness.sender.attempts.lock().is_empty());
    assert_eq!(progress.status, SyncStatus::Done);
    assert_eq!(progress.offset, 3);
}

#[tokio::test]
async fn test_orphaned_rows_advance_offset_without_delivery() {
    let source = VecSource::members(10).with_orphaned(&[2, 5, 6]);
    let harness = Harness::new(settings(), Users::default(), FlakySender::default(), source, 5);

    let first = harness.engine.run_page(SyncType::Primary, 0, 0).await.unwrap();
    assert_eq!(first.offset, 5);
    assert_eq!(first.error_count, 0);
    assert_eq!(harness.sender.attempted_users(), [1, 3, 4]);

    harness.drain().await;
    let done = harness.engine.status(SyncType::Primary).unwrap();
    assert_eq!(done.status, SyncStatus::Done);
    assert_eq!(done.offset, 10);
    assert_eq!(harness.sender.attempted_users(), [1, 3, 4, 7, 8, 9, 10]);
}
