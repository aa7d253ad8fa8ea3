use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "palaver_session";

/// The identity behind a session token.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub username: String,
    pub is_moderator: bool,
    pub created_at: DateTime<Utc>,
}

/// Opaque in-memory session tokens. This is the whole identity boundary:
/// the login UI that collects the username lives outside this backend, and
/// everything here is lost on restart like the rest of the state.
pub struct SessionStore {
    sessions: DashMap<Uuid, SessionIdentity>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Issue a token for a username. Moderator status is decided at issue
    /// time from the configured admin list.
    pub fn create(&self, username: &str, is_moderator: bool) -> Uuid {
        let token = Uuid::new_v4();
        self.sessions.insert(
            token,
            SessionIdentity {
                username: username.to_string(),
                is_moderator,
                created_at: Utc::now(),
            },
        );
        token
    }

    pub fn get(&self, token: &Uuid) -> Option<SessionIdentity> {
        self.sessions.get(token).map(|s| s.clone())
    }

    /// Invalidate a token (logout). Returns the identity it carried.
    pub fn remove(&self, token: &Uuid) -> Option<SessionIdentity> {
        self.sessions.remove(token).map(|(_, identity)| identity)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
