//! Registry of live game sessions

use dashmap::DashMap;
use uuid::Uuid;

/// Live WebSocket game sessions, keyed by session id
pub struct SessionRegistry {
    sessions: DashMap<Uuid, Uuid>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Track a new session for `user_id` and return its id
    pub fn open(&self, user_id: Uuid) -> Uuid {
        let session_id = Uuid::new_v4();
        self.sessions.insert(session_id, user_id);
        session_id
    }

    pub fn close(&self, session_id: &Uuid) -> Option<Uuid> {
        self.sessions.remove(session_id).map(|(_, user_id)| user_id)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Distinct users with at least one live session
    pub fn active_players(&self) -> usize {
        let mut users: Vec<Uuid> = self.sessions.iter().map(|s| *s.value()).collect();
        users.sort_unstable();
        users.dedup();
        users.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
