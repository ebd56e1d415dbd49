//! Session tracking.
//!
//! The orchestrator task owns its session value and pushes snapshots here
//! after every transition; readers (the snapshot endpoint) only ever see a
//! consistent copy.

use dashmap::DashMap;

use personaforge_domain::{GenerationSession, SessionId};

#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, GenerationSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: GenerationSession) {
        self.sessions.insert(session.id, session);
    }

    /// Replace the tracked snapshot with the orchestrator's current state.
    pub fn update(&self, session: &GenerationSession) {
        self.sessions.insert(session.id, session.clone());
    }

    pub fn get(&self, id: SessionId) -> Option<GenerationSession> {
        self.sessions.get(&id).map(|s| s.clone())
    }

    /// Evict terminal sessions. Their state of record is the persisted
    /// entity (or the terminal event already delivered); keeping the
    /// snapshots would grow the map without bound. Returns the eviction
    /// count.
    pub fn prune_terminal(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.status.is_terminal());
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use personaforge_domain::{EntityKind, SessionStatus, UserId};

    #[test]
    fn update_replaces_the_snapshot() {
        let store = SessionStore::new();
        let mut session = GenerationSession::new(UserId::new(), EntityKind::Character, 50, Utc::now());
        let id = session.id;
        store.insert(session.clone());

        session.start().expect("start");
        store.update(&session);

        let snapshot = store.get(id).expect("tracked");
        assert_eq!(snapshot.status, SessionStatus::Running);
    }

    #[test]
    fn prune_evicts_only_terminal_sessions() {
        let store = SessionStore::new();
        let pending = GenerationSession::new(UserId::new(), EntityKind::Character, 50, Utc::now());
        let pending_id = pending.id;
        store.insert(pending);

        let mut failed = GenerationSession::new(UserId::new(), EntityKind::Story, 50, Utc::now());
        let failed_id = failed.id;
        failed.start().expect("start");
        failed.fail("provider offline").expect("fail");
        store.insert(failed);

        assert_eq!(store.prune_terminal(), 1);
        assert!(store.get(pending_id).is_some(), "live session kept");
        assert!(store.get(failed_id).is_none(), "terminal session evicted");
    }

    #[test]
    fn get_unknown_session_returns_none() {
        let store = SessionStore::new();
        assert!(store.get(SessionId::new()).is_none());
    }
}
