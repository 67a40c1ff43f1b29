//! Query service behaviour over an in-memory store.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use parcel_audit_query::{
    AuditFilter, AuditQueryService, ExportFormat, Granularity, Page, QueryError, CSV_HEADERS,
};
use parcel_audit_store::{AuditStore, MemoryStore};
use parcel_audit_types::{
    AuditAction, AuditActor, AuditEvent, AuditOutcome, AuditPriority, ManualClock, ResourceRef,
    ResourceType, SECURITY_TAG,
};
use proptest::prelude::*;
use std::sync::Arc;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap()
}

fn service(store: &MemoryStore) -> AuditQueryService {
    AuditQueryService::new(Arc::new(store.clone()))
        .with_clock(Arc::new(ManualClock::new(now())))
        .with_offset(FixedOffset::east_opt(0).unwrap())
}

fn event(action: AuditAction, at: DateTime<Utc>) -> AuditEvent {
    AuditEvent::builder(action).build_at(at)
}

async fn seed(store: &MemoryStore, events: &[AuditEvent]) {
    store.insert_many(events).await.unwrap();
}

#[tokio::test]
async fn test_csv_export_of_two_records() {
    let store = MemoryStore::new();
    seed(
        &store,
        &[
            AuditEvent::builder(AuditAction::UserSignin)
                .actor(AuditActor::user("u1").with_email("ana@example.com").with_role("buyer"))
                .build_at(now() - Duration::hours(2)),
            AuditEvent::builder(AuditAction::LandCreate)
                .resource(ResourceRef::new(ResourceType::Land).with_name("North field"))
                .build_at(now() - Duration::hours(1)),
        ],
    )
    .await;

    let output = service(&store)
        .export(&AuditFilter::new(), ExportFormat::Csv)
        .await
        .unwrap();
    let text = String::from_utf8(output.body).unwrap();
    let lines: Vec<&str> = text.split('\n').collect();

    assert_eq!(lines.len(), 3);
    let expected_header = CSV_HEADERS
        .iter()
        .map(|h| format!("\"{h}\""))
        .collect::<Vec<_>>()
        .join(",");
    assert_eq!(lines[0], expected_header);
    for line in &lines[1..] {
        assert!(line.starts_with('"') && line.ends_with('"'));
        assert_eq!(line.matches("\",\"").count(), 13);
    }
    // newest first
    assert!(lines[1].contains("LAND_CREATE"));
    assert!(lines[2].contains("ana@example.com"));
    assert_eq!(output.file_name, "audit-logs-2024-07-15.csv");
    assert_eq!(output.content_type, "text/csv");
    assert_eq!(output.count, 2);
}

#[tokio::test]
async fn test_export_applies_list_filters() {
    let store = MemoryStore::new();
    seed(
        &store,
        &[
            AuditEvent::builder(AuditAction::LoginFailed)
                .outcome(AuditOutcome::Failure)
                .build_at(now() - Duration::minutes(5)),
            event(AuditAction::UserSignin, now() - Duration::minutes(4)),
        ],
    )
    .await;

    let output = service(&store)
        .export(&AuditFilter::new().tag(SECURITY_TAG), ExportFormat::Json)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.body).unwrap();
    assert_eq!(value["count"], 1);
    assert_eq!(output.file_name, "audit-logs-2024-07-15.json");
}

#[tokio::test]
async fn test_cleanup_deletes_only_old_records() {
    let store = MemoryStore::new();
    let mut events = Vec::new();
    for i in 0..10 {
        events.push(event(AuditAction::ApiRequest, now() - Duration::days(31 + i)));
    }
    for i in 0..5 {
        events.push(event(AuditAction::ApiRequest, now() - Duration::days(i)));
    }
    seed(&store, &events).await;

    let deleted = service(&store).cleanup(30).await.unwrap();
    assert_eq!(deleted, 10);
    assert_eq!(store.len(), 5);
}

#[tokio::test]
async fn test_cleanup_rejects_zero_days() {
    let store = MemoryStore::new();
    let result = service(&store).cleanup(0).await;
    assert!(matches!(result, Err(QueryError::Validation(_))));
}

#[tokio::test]
async fn test_cleanup_rejects_retention_beyond_calendar() {
    let store = MemoryStore::new();
    seed(&store, &[event(AuditAction::ApiRequest, now() - Duration::days(400))]).await;

    let result = service(&store).cleanup(u32::MAX).await;
    assert!(matches!(result, Err(QueryError::Validation(_))));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_list_pagination_metadata() {
    let store = MemoryStore::new();
    let events: Vec<_> = (0..7)
        .map(|i| event(AuditAction::ApiRequest, now() - Duration::minutes(i)))
        .collect();
    seed(&store, &events).await;

    let listing = service(&store)
        .list(&AuditFilter::new(), Page::new(3, 3))
        .await
        .unwrap();
    assert_eq!(listing.pagination.total, 7);
    assert_eq!(listing.pagination.pages, 3);
    assert_eq!(listing.logs.len(), 1);
    assert_eq!(listing.logs[0].id(), events[6].id());
}

#[tokio::test]
async fn test_list_rejects_bad_input() {
    let store = MemoryStore::new();
    let svc = service(&store);

    let zero_page = svc.list(&AuditFilter::new(), Page::new(0, 10)).await;
    assert!(matches!(zero_page, Err(QueryError::Validation(_))));

    let inverted = AuditFilter::new().between(Some(now()), Some(now() - Duration::days(1)));
    let result = svc.list(&inverted, Page::default()).await;
    assert!(matches!(result, Err(QueryError::Validation(_))));
}

#[tokio::test]
async fn test_get_by_id() {
    let store = MemoryStore::new();
    let stored = event(AuditAction::SystemStartup, now());
    seed(&store, &[stored.clone()]).await;
    let svc = service(&store);

    let found = svc.get_by_id(&stored.id().to_string()).await.unwrap();
    assert_eq!(found, stored);

    let missing = svc
        .get_by_id("aud_00000000-0000-4000-8000-000000000000")
        .await;
    assert!(matches!(missing, Err(QueryError::NotFound(_))));

    let malformed = svc.get_by_id("not-an-id").await;
    assert!(matches!(malformed, Err(QueryError::Validation(_))));
}

#[tokio::test]
async fn test_summary_statistics() {
    let store = MemoryStore::new();
    seed(
        &store,
        &[
            event(AuditAction::UserSignin, now() - Duration::hours(1)),
            AuditEvent::builder(AuditAction::LoginFailed)
                .outcome(AuditOutcome::Failure)
                .priority(AuditPriority::High)
                .build_at(now() - Duration::hours(2)),
            AuditEvent::builder(AuditAction::ApiError)
                .outcome(AuditOutcome::Error)
                .build_at(now() - Duration::days(2)),
            event(AuditAction::UserSignin, now() - Duration::days(3)),
        ],
    )
    .await;

    let summary = service(&store)
        .summary(Some(now() - Duration::days(1)), None)
        .await
        .unwrap();

    assert_eq!(summary.matched, 2);
    let total: u64 = summary.summary.iter().map(|s| s.total_count).sum();
    assert_eq!(total, summary.matched);

    let stats = summary.statistics;
    assert_eq!(stats.total_logs, 4);
    assert_eq!(stats.today_logs, 2);
    assert_eq!(stats.error_logs, 2);
    assert_eq!(stats.security_logs, 1);
}

#[tokio::test]
async fn test_by_date_range_requires_both_bounds() {
    let store = MemoryStore::new();
    let result = service(&store)
        .by_date_range(Some(now()), None, Granularity::Day)
        .await;
    assert!(matches!(result, Err(QueryError::Validation(_))));
}

#[tokio::test]
async fn test_by_date_range_buckets() {
    let store = MemoryStore::new();
    seed(
        &store,
        &[
            event(AuditAction::UserSignin, now() - Duration::days(1)),
            event(AuditAction::UserSignout, now() - Duration::days(1)),
            event(AuditAction::UserSignin, now()),
            event(AuditAction::UserSignin, now() - Duration::days(30)),
        ],
    )
    .await;

    let report = service(&store)
        .by_date_range(Some(now() - Duration::days(7)), Some(now()), Granularity::Day)
        .await
        .unwrap();

    let keys: Vec<_> = report.buckets.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, vec!["2024-07-14", "2024-07-15"]);
    assert_eq!(report.buckets[0].count, 2);
    assert_eq!(report.buckets[0].actions.len(), 2);
}

#[tokio::test]
async fn test_convenience_listings() {
    let store = MemoryStore::new();
    seed(
        &store,
        &[
            AuditEvent::builder(AuditAction::LandUpdate)
                .actor(AuditActor::user("u-7"))
                .build_at(now()),
            AuditEvent::builder(AuditAction::SystemStartup)
                .resource(ResourceRef::new(ResourceType::System))
                .build_at(now()),
            AuditEvent::builder(AuditAction::SuspiciousActivity)
                .outcome(AuditOutcome::Warning)
                .build_at(now()),
            AuditEvent::builder(AuditAction::ApiError)
                .outcome(AuditOutcome::Error)
                .build_at(now()),
        ],
    )
    .await;
    let svc = service(&store);
    let page = Page::default();

    let user = svc.user_logs("u-7", AuditFilter::new(), page).await.unwrap();
    assert_eq!(user.pagination.total, 1);
    let system = svc.system_logs(AuditFilter::new(), page).await.unwrap();
    assert_eq!(system.logs[0].action(), AuditAction::SystemStartup);
    let security = svc.security_logs(AuditFilter::new(), page).await.unwrap();
    assert_eq!(security.logs[0].action(), AuditAction::SuspiciousActivity);
    let errors = svc.error_logs(AuditFilter::new(), page).await.unwrap();
    assert_eq!(errors.logs[0].action(), AuditAction::ApiError);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_pages_cover_full_result(
        offsets in proptest::collection::vec(0i64..500, 0..40),
        size in 1u32..9,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let store = MemoryStore::new();
            let events: Vec<_> = offsets
                .iter()
                .map(|m| event(AuditAction::ApiRequest, now() - Duration::minutes(*m)))
                .collect();
            seed(&store, &events).await;
            let svc = service(&store);
            let filter = AuditFilter::new();

            let full = store.find(&filter, None).await.unwrap();
            let first = svc.list(&filter, Page::new(1, size)).await.unwrap();
            let pages = first.pagination.pages;
            prop_assert_eq!(pages, (events.len() as u64).div_ceil(u64::from(size)));

            let mut joined = Vec::new();
            for number in 1..=pages {
                let listing = svc.list(&filter, Page::new(number as u32, size)).await.unwrap();
                joined.extend(listing.logs);
            }
            prop_assert_eq!(joined.len(), events.len());
            prop_assert_eq!(&joined, &full);
            prop_assert!(joined.windows(2).all(|w| w[0].timestamp() >= w[1].timestamp()));
            Ok(())
        })?;
    }
}
