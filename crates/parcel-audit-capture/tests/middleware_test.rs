//! Request observation and recorder shapes, checked through a collecting sink.

use async_trait::async_trait;
use parcel_audit_capture::{
    AuditMiddleware, AuditRecorder, AuditSink, AuthObserver, CallContext, CrudObserver,
    FileInfo, FileObserver, RequestDescriptor, ResponseDescriptor, SecurityObserver, REDACTED,
};
use parcel_audit_types::{
    AuditAction, AuditActor, AuditEvent, AuditOutcome, AuditPriority, HttpMethod, ResourceType,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl CollectingSink {
    fn take(&self) -> Vec<AuditEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

#[async_trait]
impl AuditSink for CollectingSink {
    async fn submit(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

fn signin_request() -> RequestDescriptor {
    RequestDescriptor::new(HttpMethod::Post, "/api/auth/signin")
        .header("User-Agent", "Mozilla/5.0")
        .header("Cookie", "sid=abc")
        .header("X-Forwarded-For", "198.51.100.4, 10.0.0.1")
}

#[tokio::test]
async fn test_signin_records_api_request_and_auth() {
    let sink = Arc::new(CollectingSink::default());
    let middleware = AuditMiddleware::new(sink.clone()).with_observer(AuthObserver {
        action: AuditAction::UserSignin,
    });

    let body = json!({"data": {"user": {"_id": "u-7", "email": "ana@example.com", "role": "buyer"}}});
    let response = ResponseDescriptor::from_json(200, &body);
    middleware
        .after_response(&signin_request(), &response, Duration::from_millis(25))
        .await;

    let events = sink.take();
    assert_eq!(events.len(), 2);

    let api = &events[0];
    assert_eq!(api.action(), AuditAction::ApiRequest);
    assert_eq!(api.ip_address(), Some("198.51.100.4"));
    assert_eq!(api.metadata()["headers"]["cookie"], json!(REDACTED));
    assert_eq!(api.metrics().unwrap().duration_ms, Some(25));

    let auth = &events[1];
    assert_eq!(auth.action(), AuditAction::UserSignin);
    assert_eq!(auth.user_id(), Some("u-7"));
    assert_eq!(auth.outcome(), AuditOutcome::Success);
    assert_eq!(auth.metadata()["user_agent"], json!("Mozilla/5.0"));
}

#[tokio::test]
async fn test_failed_signin_is_high_priority() {
    let sink = Arc::new(CollectingSink::default());
    let middleware = AuditMiddleware::bare(sink.clone()).with_observer(AuthObserver {
        action: AuditAction::LoginFailed,
    });

    let response = ResponseDescriptor::from_json(401, &json!({"error": "Invalid credentials"}));
    middleware
        .after_response(&signin_request(), &response, Duration::ZERO)
        .await;

    let events = sink.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome(), AuditOutcome::Failure);
    assert_eq!(events[0].priority(), AuditPriority::High);
    assert_eq!(events[0].error_message(), Some("Invalid credentials"));
    assert!(events[0].user_id().is_none());
}

#[tokio::test]
async fn test_crud_file_and_security_observers() {
    let sink = Arc::new(CollectingSink::default());
    let middleware = AuditMiddleware::bare(sink.clone())
        .with_observer(CrudObserver {
            action: AuditAction::ListingCreate,
            resource_type: ResourceType::Listing,
        })
        .with_observer(FileObserver {
            action: AuditAction::FileUpload,
        })
        .with_observer(SecurityObserver {
            action: AuditAction::SuspiciousActivity,
        });

    let mut request = RequestDescriptor::new(HttpMethod::Post, "/api/listings")
        .user(AuditActor::user("seller-1").with_role("seller"))
        .session("sess-42")
        .peer("192.0.2.10");
    request.file = Some(FileInfo {
        id: Some("f-1".into()),
        filename: Some("deed.pdf".into()),
        size: Some(2048),
        mime_type: Some("application/pdf".into()),
        ..Default::default()
    });

    let body = json!({"data": {"_id": "l-1", "title": "Hillside plot"}, "message": "created"});
    middleware
        .after_response(&request, &ResponseDescriptor::from_json(201, &body), Duration::ZERO)
        .await;

    let events = sink.take();
    assert_eq!(events.len(), 3);

    let listing = &events[0];
    assert_eq!(listing.resource().unwrap().name.as_deref(), Some("Hillside plot"));
    assert_eq!(listing.session_id(), Some("sess-42"));
    assert_eq!(listing.priority(), AuditPriority::Medium);

    let file = &events[1];
    assert_eq!(file.metadata()["file_size"], json!(2048));
    assert_eq!(file.resource().unwrap().id.as_deref(), Some("f-1"));

    let security = &events[2];
    assert!(security.has_tag("SECURITY"));
    assert_eq!(security.metadata()["message"], json!("created"));
}

#[tokio::test]
async fn test_unhandled_error_is_recorded() {
    let sink = Arc::new(CollectingSink::default());
    let middleware = AuditMiddleware::new(sink.clone());

    let request = RequestDescriptor::new(HttpMethod::Delete, "/api/lands/3")
        .user(AuditActor::user("admin"));
    middleware
        .on_error(&request, 500, "database unreachable", Some("at handler".into()))
        .await;

    let events = sink.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action(), AuditAction::ApiError);
    assert_eq!(events[0].outcome(), AuditOutcome::Error);
    assert_eq!(events[0].status_code(), Some(500));
    assert_eq!(events[0].error_stack(), Some("at handler"));
    assert!(events[0].requires_immediate_write());
}

#[tokio::test]
async fn test_recorder_shapes() {
    let sink = Arc::new(CollectingSink::default());
    let recorder = AuditRecorder::new(sink.clone());
    let ctx = CallContext::new().with_actor(AuditActor::user("u-1"));

    recorder
        .transaction_action(
            AuditAction::TransactionApprove,
            &ctx,
            Some(&json!({"_id": "t-1", "transactionId": "TX-1"})),
            Some(json!({"status": "pending"})),
            Some(json!({"status": "approved"})),
        )
        .await;
    recorder
        .system_action(AuditAction::SessionCleanup, json!({"removed": 4}), AuditPriority::Low)
        .await;
    recorder
        .security_event(AuditAction::RateLimitExceeded, &ctx, json!({"limit": 100}))
        .await;

    let events = sink.take();
    assert_eq!(events[0].priority(), AuditPriority::High);
    assert_eq!(events[0].resource_type(), Some(ResourceType::Transaction));
    assert!(events[1].actor().is_none());
    assert_eq!(events[1].metadata()["removed"], json!(4));
    assert_eq!(events[2].priority(), AuditPriority::High);
    assert!(events[2].has_tag("SECURITY"));
}
