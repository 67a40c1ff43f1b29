//! Session manager transitions and the events they record.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parcel_audit_capture::AuditSink;
use parcel_audit_session::{
    InvalidReason, MemorySessionStore, SessionDecision, SessionError, SessionId, SessionManager,
    SessionPolicy, SessionState, SessionStore, SessionUser,
};
use parcel_audit_types::{
    AuditAction, AuditActor, AuditEvent, AuditOutcome, AuditPriority, ManualClock, ResourceType,
};
use parking_lot::Mutex;
use serde_json::{json, Map};
use std::sync::Arc;

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl CollectingSink {
    fn actions(&self) -> Vec<AuditAction> {
        self.events.lock().iter().map(|e| e.action()).collect()
    }

    fn last(&self) -> AuditEvent {
        self.events.lock().last().cloned().expect("no events recorded")
    }

    fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl AuditSink for CollectingSink {
    async fn submit(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

struct Harness {
    manager: SessionManager,
    store: MemorySessionStore,
    sink: Arc<CollectingSink>,
    clock: ManualClock,
}

fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-10T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn harness() -> Harness {
    let store = MemorySessionStore::new();
    let sink = Arc::new(CollectingSink::default());
    let clock = ManualClock::new(start());
    let manager = SessionManager::new(
        Arc::new(store.clone()),
        sink.clone(),
        Arc::new(clock.clone()),
        SessionPolicy::default(),
    );
    Harness {
        manager,
        store,
        sink,
        clock,
    }
}

fn ana() -> SessionUser {
    SessionUser::new("u-ana", "ana@example.com", "Ana", "buyer")
}

#[tokio::test]
async fn test_sign_in_records_create_and_signin() {
    let h = harness();
    let id = h.manager.sign_in(ana(), None).await.unwrap();

    assert_eq!(
        h.sink.actions(),
        vec![AuditAction::SessionCreate, AuditAction::UserSignin]
    );
    let signin = h.sink.last();
    assert_eq!(signin.user_id(), Some("u-ana"));
    assert_eq!(signin.session_id(), Some(id.as_str()));
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn test_expired_session_is_destroyed_and_recorded() {
    let h = harness();
    let id = h.manager.sign_in(ana(), None).await.unwrap();
    h.sink.clear();

    h.clock.advance(Duration::minutes(61));
    let decision = h.manager.validate(Some(&id), None).await.unwrap();

    assert_eq!(decision, SessionDecision::Invalid(InvalidReason::Expired));
    assert!(h.store.is_empty());
    let event = h.sink.last();
    assert_eq!(event.action(), AuditAction::SessionExpire);
    assert_eq!(event.outcome(), AuditOutcome::Warning);
    assert_eq!(event.priority(), AuditPriority::High);
    assert_eq!(event.metadata()["inactive_secs"], json!(61 * 60));

    // gone for good
    let again = h.manager.validate(Some(&id), None).await.unwrap();
    assert_eq!(again.reason(), Some(InvalidReason::NoActiveSession));
}

#[tokio::test]
async fn test_authorized_requests_keep_session_alive() {
    let h = harness();
    let id = h.manager.sign_in(ana(), None).await.unwrap();

    for _ in 0..3 {
        h.clock.advance(Duration::minutes(50));
        let auth = h.manager.authorize_request(Some(&id), None).await.unwrap();
        assert!(auth.is_granted());
        assert!(!auth.decision.expiring_soon());
    }

    let state = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(state.visit_count, 4);
    assert_eq!(state.last_activity, Some(start() + Duration::minutes(150)));
}

#[tokio::test]
async fn test_expiry_warning_does_not_invalidate() {
    let h = harness();
    let id = h.manager.sign_in(ana(), None).await.unwrap();

    h.clock.advance(Duration::minutes(57));
    let auth = h.manager.authorize_request(Some(&id), None).await.unwrap();
    assert_eq!(auth.decision, SessionDecision::Valid { expiring_soon: true });

    let next = h.manager.authorize_request(Some(&id), None).await.unwrap();
    assert_eq!(next.decision, SessionDecision::Valid { expiring_soon: false });
}

#[tokio::test]
async fn test_malformed_session_is_rejected_but_kept() {
    let h = harness();
    let id = SessionId::from("legacy");
    let mut state = SessionState::for_user(ana(), start());
    state.user.as_mut().unwrap().role = None;
    h.store.put(&id, state).await.unwrap();

    let auth = h.manager.authorize_request(Some(&id), None).await.unwrap();
    assert_eq!(auth.decision.reason(), Some(InvalidReason::Malformed));
    assert!(auth.session.is_none());
    assert_eq!(h.store.len(), 1);
    assert!(h.sink.actions().is_empty());
}

#[tokio::test]
async fn test_sign_out() {
    let h = harness();
    let id = h.manager.sign_in(ana(), None).await.unwrap();
    h.sink.clear();

    assert!(h.manager.sign_out(&id, None).await.unwrap());
    assert_eq!(
        h.sink.actions(),
        vec![AuditAction::SessionDestroy, AuditAction::UserSignout]
    );
    assert!(!h.manager.sign_out(&id, None).await.unwrap());
    assert_eq!(h.sink.actions().len(), 2);
}

#[tokio::test]
async fn test_regeneration_swaps_id_and_resets_clock() {
    let h = harness();
    let old = h.manager.sign_in(ana(), None).await.unwrap();
    let mut prefs = Map::new();
    prefs.insert("theme".into(), json!("dark"));
    h.manager.update_preferences(&old, prefs).await.unwrap();

    h.clock.advance(Duration::minutes(40));
    let new = h
        .manager
        .regenerate_after_password_change(&old, None)
        .await
        .unwrap();

    assert_ne!(old, new);
    assert!(h.store.get(&old).await.unwrap().is_none());
    let state = h.store.get(&new).await.unwrap().unwrap();
    assert_eq!(state.user, Some(ana()));
    assert_eq!(state.preferences["theme"], json!("dark"));
    assert_eq!(state.last_activity, Some(start() + Duration::minutes(40)));
    assert_eq!(state.login_time, Some(start()));

    let event = h.sink.last();
    assert_eq!(event.action(), AuditAction::PasswordChange);
    assert_eq!(event.session_id(), Some(new.as_str()));

    h.clock.advance(Duration::minutes(30));
    assert!(h.manager.validate(Some(&new), None).await.unwrap().is_valid());
}

#[tokio::test]
async fn test_regenerating_unknown_session_fails() {
    let h = harness();
    let result = h
        .manager
        .regenerate_after_password_change(&SessionId::from("nope"), None)
        .await;
    assert!(matches!(result, Err(SessionError::NotFound(_))));
}

#[tokio::test]
async fn test_expired_session_cannot_be_regenerated() {
    let h = harness();
    let id = h.manager.sign_in(ana(), None).await.unwrap();
    h.sink.clear();

    h.clock.advance(Duration::minutes(120));
    let result = h.manager.regenerate_after_password_change(&id, None).await;

    assert!(matches!(
        result,
        Err(SessionError::Invalid(InvalidReason::Expired))
    ));
    assert_eq!(h.store.len(), 0);
    assert_eq!(h.sink.actions(), vec![AuditAction::SessionExpire]);
}

#[tokio::test]
async fn test_malformed_session_cannot_be_regenerated() {
    let h = harness();
    let id = SessionId::from("legacy");
    let mut state = SessionState::for_user(ana(), start());
    state.user.as_mut().unwrap().email = None;
    h.store.put(&id, state).await.unwrap();

    let result = h.manager.regenerate_after_password_change(&id, None).await;

    assert!(matches!(
        result,
        Err(SessionError::Invalid(InvalidReason::Malformed))
    ));
    assert!(h.store.get(&id).await.unwrap().is_some());
    assert!(h.sink.actions().is_empty());
}

#[tokio::test]
async fn test_force_logout_user() {
    let h = harness();
    h.manager.sign_in(ana(), None).await.unwrap();
    h.manager.sign_in(ana(), None).await.unwrap();
    let bob = SessionUser::new("u-bob", "bob@example.com", "Bob", "seller");
    h.manager.sign_in(bob, None).await.unwrap();

    let admin = AuditActor::user("admin-1").with_role("admin");
    let removed = h.manager.force_logout_user("u-ana", Some(admin)).await.unwrap();

    assert_eq!(removed, 2);
    assert_eq!(h.store.len(), 1);
    let event = h.sink.last();
    assert_eq!(event.action(), AuditAction::UserForceLogout);
    assert_eq!(event.user_id(), Some("admin-1"));
    assert_eq!(event.resource_type(), Some(ResourceType::User));
    assert_eq!(event.resource().unwrap().id.as_deref(), Some("u-ana"));
}

#[tokio::test]
async fn test_stats_cleanup_and_listing() {
    let h = harness();
    let stale = h.manager.sign_in(ana(), None).await.unwrap();
    h.clock.advance(Duration::minutes(90));
    let fresh = h.manager.sign_in(ana(), None).await.unwrap();

    let stats = h.manager.stats().await.unwrap();
    assert_eq!((stats.total, stats.active, stats.expired), (2, 1, 1));

    let sessions = h.manager.user_sessions("u-ana").await.unwrap();
    assert_eq!(sessions.len(), 2);
    let listed = sessions.iter().find(|s| s.session_id == fresh).unwrap();
    assert_eq!(
        listed.expires,
        Some(start() + Duration::minutes(90) + Duration::hours(1))
    );

    assert_eq!(h.manager.cleanup_expired().await.unwrap(), 1);
    assert!(h.store.get(&stale).await.unwrap().is_none());
    let event = h.sink.last();
    assert_eq!(event.action(), AuditAction::SessionCleanup);
    assert_eq!(event.metadata()["removed"], json!(1));
    assert!(h.manager.user_sessions("u-bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_session_id() {
    let h = harness();
    let auth = h.manager.authorize_request(None, None).await.unwrap();
    assert_eq!(auth.decision.reason(), Some(InvalidReason::NoActiveSession));
}
