//! Session persistence.

use crate::error::SessionResult;
use crate::state::{SessionId, SessionState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Backend holding session state by id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a session.
    async fn get(&self, id: &SessionId) -> SessionResult<Option<SessionState>>;

    /// Insert or replace a session.
    async fn put(&self, id: &SessionId, state: SessionState) -> SessionResult<()>;

    /// Remove a session. Returns whether it existed.
    async fn remove(&self, id: &SessionId) -> SessionResult<bool>;

    /// Every stored session.
    async fn all(&self) -> SessionResult<Vec<(SessionId, SessionState)>>;

    /// Remove every session of a user. Returns the number removed.
    async fn remove_user(&self, user_id: &str) -> SessionResult<usize>;

    /// Remove sessions last active before `cutoff`. Returns the number removed.
    async fn remove_inactive_since(&self, cutoff: DateTime<Utc>) -> SessionResult<usize>;
}

/// In-memory session store.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, SessionState>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &SessionId) -> SessionResult<Option<SessionState>> {
        Ok(self.sessions.read().get(id).cloned())
    }

    async fn put(&self, id: &SessionId, state: SessionState) -> SessionResult<()> {
        self.sessions.write().insert(id.clone(), state);
        Ok(())
    }

    async fn remove(&self, id: &SessionId) -> SessionResult<bool> {
        Ok(self.sessions.write().remove(id).is_some())
    }

    async fn all(&self) -> SessionResult<Vec<(SessionId, SessionState)>> {
        let mut sessions: Vec<_> = self
            .sessions
            .read()
            .iter()
            .map(|(id, state)| (id.clone(), state.clone()))
            .collect();
        sessions.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(sessions)
    }

    async fn remove_user(&self, user_id: &str) -> SessionResult<usize> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, state| state.user_id() != Some(user_id));
        Ok(before - sessions.len())
    }

    async fn remove_inactive_since(&self, cutoff: DateTime<Utc>) -> SessionResult<usize> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, state| state.last_activity.map_or(true, |at| at >= cutoff));
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionUser;
    use chrono::Duration;

    fn state(user: &str, at: DateTime<Utc>) -> SessionState {
        SessionState::for_user(SessionUser::new(user, "e", "n", "r"), at)
    }

    #[tokio::test]
    async fn test_remove_user_only_touches_that_user() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        store.put(&"a".into(), state("u1", now)).await.unwrap();
        store.put(&"b".into(), state("u1", now)).await.unwrap();
        store.put(&"c".into(), state("u2", now)).await.unwrap();

        assert_eq!(store.remove_user("u1").await.unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(&"c".into()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_inactive_since() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        store.put(&"old".into(), state("u", now - Duration::hours(2))).await.unwrap();
        store.put(&"new".into(), state("u", now)).await.unwrap();

        assert_eq!(store.remove_inactive_since(now - Duration::hours(1)).await.unwrap(), 1);
        assert!(!store.remove(&"old".into()).await.unwrap());
        assert!(store.remove(&"new".into()).await.unwrap());
    }
}
