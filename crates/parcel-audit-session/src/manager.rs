//! Session lifecycle with audit emission.

use crate::error::{SessionError, SessionResult};
use crate::state::{SessionId, SessionState, SessionStats, SessionSummary, SessionUser};
use crate::store::SessionStore;
use crate::validate::{validate, InvalidReason, SessionDecision, SessionPolicy};
use parcel_audit_capture::events::{self, CallContext};
use parcel_audit_capture::AuditSink;
use parcel_audit_types::{
    AuditAction, AuditActor, AuditOutcome, AuditPriority, Clock, RequestContext, ResourceRef,
    ResourceType,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of authorizing one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Authorization {
    /// Validation result, taken before the activity bump.
    pub decision: SessionDecision,
    /// Session after the activity bump; present only when valid.
    pub session: Option<SessionState>,
}

impl Authorization {
    /// Check if the request may proceed.
    pub fn is_granted(&self) -> bool {
        self.decision.is_valid()
    }
}

/// Creates, validates and destroys sessions, recording each transition.
///
/// Session state moves from anonymous to active on sign-in, stays active
/// while validated requests keep arriving, and ends as expired or
/// destroyed. Regeneration after a password change swaps the session id
/// while keeping the user.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    sink: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    policy: SessionPolicy,
}

impl SessionManager {
    /// Create a manager over `store`, recording transitions to `sink`.
    pub fn new(
        store: Arc<dyn SessionStore>,
        sink: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            store,
            sink,
            clock,
            policy,
        }
    }

    /// Expiry and warning windows in force.
    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Start a session for a user who just authenticated.
    pub async fn sign_in(
        &self,
        user: SessionUser,
        request: Option<RequestContext>,
    ) -> SessionResult<SessionId> {
        let now = self.clock.now();
        let id = SessionId::generate();
        let state = SessionState::for_user(user, now);
        let ctx = context(&id, &state, request);
        self.store.put(&id, state).await?;

        self.sink
            .submit(events::session(
                AuditAction::SessionCreate,
                &ctx,
                json!({ "login_time": now }),
            ))
            .await;
        self.sink
            .submit(events::auth(
                AuditAction::UserSignin,
                &ctx,
                AuditOutcome::Success,
                None,
            ))
            .await;

        debug!(session = %id, "Session created");
        Ok(id)
    }

    /// Check a session without touching its activity clock.
    ///
    /// An expired session is destroyed and a `SESSION_EXPIRE` event is
    /// recorded with outcome `WARNING` and priority `HIGH`.
    pub async fn validate(
        &self,
        id: Option<&SessionId>,
        request: Option<RequestContext>,
    ) -> SessionResult<SessionDecision> {
        let (decision, _) = self.check(id, request).await?;
        Ok(decision)
    }

    /// Validate a session for an incoming request and record the activity.
    ///
    /// A granted request bumps `last_activity` and the visit count.
    /// `expiring_soon` on the decision reflects the inactivity before the
    /// bump.
    pub async fn authorize_request(
        &self,
        id: Option<&SessionId>,
        request: Option<RequestContext>,
    ) -> SessionResult<Authorization> {
        let (decision, state) = self.check(id, request).await?;
        let (Some(id), Some(mut state)) = (id, state.filter(|_| decision.is_valid())) else {
            return Ok(Authorization {
                decision,
                session: None,
            });
        };

        if decision.expiring_soon() {
            debug!(session = %id, "Session expiring soon");
        }
        state.touch(self.clock.now());
        self.store.put(id, state.clone()).await?;

        Ok(Authorization {
            decision,
            session: Some(state),
        })
    }

    async fn check(
        &self,
        id: Option<&SessionId>,
        request: Option<RequestContext>,
    ) -> SessionResult<(SessionDecision, Option<SessionState>)> {
        let state = match id {
            Some(id) => self.store.get(id).await?,
            None => None,
        };
        let now = self.clock.now();
        let decision = validate(state.as_ref(), &self.policy, now);

        if let (Some(id), Some(state), SessionDecision::Invalid(InvalidReason::Expired)) =
            (id, &state, decision)
        {
            self.store.remove(id).await?;
            let inactive_secs = state
                .inactivity(now)
                .map(|d| d.num_seconds())
                .unwrap_or_default();
            let ctx = context(id, state, request);
            self.sink
                .submit(events::session_with(
                    AuditAction::SessionExpire,
                    &ctx,
                    json!({ "inactive_secs": inactive_secs }),
                    AuditOutcome::Warning,
                    AuditPriority::High,
                ))
                .await;
            info!(session = %id, inactive_secs, "Session expired");
        } else if let SessionDecision::Invalid(reason) = decision {
            debug!(reason = %reason, "Session rejected");
        }

        Ok((decision, state))
    }

    /// End a session. Returns whether it existed.
    pub async fn sign_out(
        &self,
        id: &SessionId,
        request: Option<RequestContext>,
    ) -> SessionResult<bool> {
        let Some(state) = self.store.get(id).await? else {
            return Ok(false);
        };
        let removed = self.store.remove(id).await?;

        let ctx = context(id, &state, request);
        self.sink
            .submit(events::session(AuditAction::SessionDestroy, &ctx, Value::Null))
            .await;
        self.sink
            .submit(events::auth(
                AuditAction::UserSignout,
                &ctx,
                AuditOutcome::Success,
                None,
            ))
            .await;
        Ok(removed)
    }

    /// Replace a session after its user changed their password.
    ///
    /// The user payload and preferences carry over to a new id; the
    /// activity clock restarts and the old id stops working. Only a valid
    /// session can be regenerated: an expired one is destroyed as in
    /// [`SessionManager::validate`] and the call fails.
    pub async fn regenerate_after_password_change(
        &self,
        id: &SessionId,
        request: Option<RequestContext>,
    ) -> SessionResult<SessionId> {
        let (decision, state) = self.check(Some(id), request.clone()).await?;
        let mut state = match (decision, state) {
            (_, None) => return Err(SessionError::NotFound(id.to_string())),
            (SessionDecision::Invalid(reason), Some(_)) => {
                return Err(SessionError::Invalid(reason))
            }
            (SessionDecision::Valid { .. }, Some(state)) => state,
        };

        let new_id = SessionId::generate();
        state.last_activity = Some(self.clock.now());
        self.store.remove(id).await?;
        self.store.put(&new_id, state.clone()).await?;

        let ctx = context(&new_id, &state, request);
        self.sink
            .submit(events::auth(
                AuditAction::PasswordChange,
                &ctx,
                AuditOutcome::Success,
                None,
            ))
            .await;

        info!(user = state.user_id().unwrap_or("-"), "Session regenerated after password change");
        Ok(new_id)
    }

    /// Destroy every session of a user. Returns the number destroyed.
    pub async fn force_logout_user(
        &self,
        user_id: &str,
        admin: Option<AuditActor>,
    ) -> SessionResult<usize> {
        let removed = self.store.remove_user(user_id).await?;

        let mut ctx = CallContext::new();
        ctx.actor = admin;
        let event = events::mutation_with_outcome(
            AuditAction::UserForceLogout,
            &ctx,
            ResourceRef::new(ResourceType::User).with_id(user_id),
            None,
            Some(json!({ "sessions_removed": removed })),
            AuditOutcome::Success,
        );
        self.sink.submit(event).await;

        warn!(user = user_id, removed, "User forcibly logged out");
        Ok(removed)
    }

    /// Remove sessions inactive beyond the maximum age.
    pub async fn cleanup_expired(&self) -> SessionResult<usize> {
        let cutoff = self.clock.now() - self.policy.max_age;
        let removed = self.store.remove_inactive_since(cutoff).await?;

        self.sink
            .submit(events::system(
                AuditAction::SessionCleanup,
                json!({ "removed": removed }),
                AuditPriority::Low,
            ))
            .await;

        debug!(removed, "Expired sessions cleaned up");
        Ok(removed)
    }

    /// Count sessions by state.
    pub async fn stats(&self) -> SessionResult<SessionStats> {
        let now = self.clock.now();
        let sessions = self.store.all().await?;
        let active = sessions
            .iter()
            .filter(|(_, state)| {
                state
                    .expires_at(self.policy.max_age)
                    .is_some_and(|expires| expires > now)
            })
            .count();

        Ok(SessionStats {
            total: sessions.len(),
            active,
            expired: sessions.len() - active,
        })
    }

    /// Sessions belonging to a user.
    pub async fn user_sessions(&self, user_id: &str) -> SessionResult<Vec<SessionSummary>> {
        Ok(self
            .store
            .all()
            .await?
            .into_iter()
            .filter(|(_, state)| state.user_id() == Some(user_id))
            .map(|(session_id, state)| SessionSummary {
                session_id,
                expires: state.expires_at(self.policy.max_age),
                last_activity: state.last_activity,
                login_time: state.login_time,
                visit_count: state.visit_count,
            })
            .collect())
    }

    /// Merge preference values into a session.
    pub async fn update_preferences(
        &self,
        id: &SessionId,
        preferences: Map<String, Value>,
    ) -> SessionResult<SessionState> {
        let mut state = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        state.preferences.extend(preferences);
        self.store.put(id, state.clone()).await?;
        Ok(state)
    }
}

fn context(id: &SessionId, state: &SessionState, request: Option<RequestContext>) -> CallContext {
    CallContext {
        actor: state.user.as_ref().and_then(SessionUser::actor),
        session_id: Some(id.to_string()),
        request,
        status_code: None,
    }
}
