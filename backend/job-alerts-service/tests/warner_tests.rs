/// Integration tests for expiration warnings
mod common;

use chrono::{Duration, TimeZone, Utc};
use common::*;
use job_alerts_service::services::{warning_window, ExpiryWarner, PushTarget, WarnReport};
use std::sync::Arc;

#[tokio::test]
async fn test_only_jobs_expiring_in_two_days_are_warned() {
    let now = Utc.with_ymd_and_hms(2024, 6, 10, 9, 30, 0).unwrap();
    let store = Arc::new(ObservedStore::new());
    let push = Arc::new(RecordingDispatcher::new());
    seed_user(&store.inner, "u1", Some("token-u1-0000")).await;
    seed_user(&store.inner, "u2", Some("token-u2-0000")).await;
    seed_job(&store.inner, "in-two", expiring(clerk_job("u1"), now + Duration::days(2))).await;
    seed_job(&store.inner, "in-five", expiring(clerk_job("u2"), now + Duration::days(5))).await;
    let ctx = context(store.clone(), push.clone());

    let report = ExpiryWarner::default().warn(&ctx, now).await.unwrap();

    assert_eq!(
        report,
        WarnReport {
            matched: 1,
            sent: 1,
            skipped: 0,
            failed: 0
        }
    );
    let sent = push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].target, PushTarget::Token("token-u1-0000".to_string()));
    assert_eq!(sent[0].data["jobId"], "in-two");
    assert_eq!(sent[0].body, "Your job \"Clerk\" expires in 2 days.");
}

#[tokio::test]
async fn test_window_edges() {
    let now = Utc.with_ymd_and_hms(2024, 6, 10, 23, 59, 0).unwrap();
    let (start, end) = warning_window(now, 2).unwrap();
    let store = Arc::new(ObservedStore::new());
    let push = Arc::new(RecordingDispatcher::new());
    seed_user(&store.inner, "u1", Some("token-u1-0000")).await;
    seed_job(&store.inner, "first-instant", expiring(clerk_job("u1"), start)).await;
    seed_job(&store.inner, "last-instant", expiring(clerk_job("u1"), end)).await;
    seed_job(
        &store.inner,
        "next-day",
        expiring(clerk_job("u1"), end + Duration::milliseconds(1)),
    )
    .await;
    seed_job(
        &store.inner,
        "day-before",
        expiring(clerk_job("u1"), start - Duration::milliseconds(1)),
    )
    .await;
    let ctx = context(store.clone(), push.clone());

    let report = ExpiryWarner::default().warn(&ctx, now).await.unwrap();

    assert_eq!(report.matched, 2);
    let mut warned: Vec<String> = push.sent().iter().map(|m| m.data["jobId"].clone()).collect();
    warned.sort();
    assert_eq!(warned, vec!["first-instant", "last-instant"]);
}

#[tokio::test]
async fn test_one_failed_send_does_not_block_others() {
    let now = Utc::now();
    let store = Arc::new(ObservedStore::new());
    let push = Arc::new(RecordingDispatcher::failing_for(&["token-bad-0000"]));
    seed_user(&store.inner, "bad", Some("token-bad-0000")).await;
    seed_user(&store.inner, "good", Some("token-good-000")).await;
    seed_user(&store.inner, "silent", None).await;
    let at = now + Duration::days(2);
    seed_job(&store.inner, "j-bad", expiring(clerk_job("bad"), at)).await;
    seed_job(&store.inner, "j-good", expiring(clerk_job("good"), at)).await;
    seed_job(&store.inner, "j-silent", expiring(clerk_job("silent"), at)).await;
    let ctx = context(store.clone(), push.clone());

    let report = ExpiryWarner::default().warn(&ctx, now).await.unwrap();

    assert_eq!(
        report,
        WarnReport {
            matched: 3,
            sent: 1,
            skipped: 1,
            failed: 1
        }
    );
    let sent = push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].data["jobId"], "j-good");
}

#[tokio::test]
async fn test_no_expiring_jobs() {
    let now = Utc::now();
    let store = Arc::new(ObservedStore::new());
    let push = Arc::new(RecordingDispatcher::new());
    seed_job(&store.inner, "later", expiring(clerk_job("u1"), now + Duration::days(30))).await;
    let ctx = context(store.clone(), push.clone());

    let report = ExpiryWarner::default().warn(&ctx, now).await.unwrap();

    assert_eq!(report, WarnReport::default());
    assert!(push.sent().is_empty());
}
