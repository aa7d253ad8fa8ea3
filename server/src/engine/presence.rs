use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Seconds after which a typing flag expires without a stop event.
/// Readers apply this TTL; writers only record the timestamp.
pub const TYPING_TTL_SECONDS: i64 = 3;

/// Approximate geolocation attached to a presence record. Lookups that fail
/// degrade to "Unknown" placeholders instead of blocking the user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub country: String,
    pub city: String,
    pub isp: String,
}

impl GeoInfo {
    pub fn unknown() -> Self {
        Self {
            country: "Unknown".to_string(),
            city: "Unknown".to_string(),
            isp: "Unknown".to_string(),
        }
    }

    pub fn local() -> Self {
        Self {
            country: "Local".to_string(),
            city: "Local Network".to_string(),
            isp: "Private".to_string(),
        }
    }
}

/// Live record of one username's activity.
#[derive(Debug, Clone, Serialize)]
pub struct PresenceRecord {
    pub last_seen: DateTime<Utc>,
    pub ip: String,
    pub geo: GeoInfo,
    pub room: String,
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typing_since: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typing_room: Option<String>,
}

/// A user visible in a room's online list.
#[derive(Debug, Clone, Serialize)]
pub struct OnlineUser {
    pub username: String,
    pub geo: GeoInfo,
}

/// Per-username presence map. Timestamps are monotonic per key: a stale
/// request reordered by the network never rolls `last_seen` or
/// `typing_since` backwards.
pub struct PresenceTracker {
    users: DashMap<String, PresenceRecord>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    /// Create or update a record, refreshing `last_seen`. Connection
    /// metadata (ip, geo, user agent) is captured on first sight and
    /// refreshed on subsequent touches.
    pub fn touch(
        &self,
        username: &str,
        ip: &str,
        room: &str,
        user_agent: &str,
        geo: GeoInfo,
        now: DateTime<Utc>,
    ) {
        match self.users.get_mut(username) {
            Some(mut record) => {
                if now > record.last_seen {
                    record.last_seen = now;
                }
                record.room = room.to_string();
                record.ip = ip.to_string();
                record.user_agent = user_agent.to_string();
            }
            None => {
                self.users.insert(
                    username.to_string(),
                    PresenceRecord {
                        last_seen: now,
                        ip: ip.to_string(),
                        geo,
                        room: room.to_string(),
                        user_agent: user_agent.to_string(),
                        typing_since: None,
                        typing_room: None,
                    },
                );
            }
        }
    }

    /// Refresh `last_seen` and room for an existing record only. The send
    /// path uses this: presence records are created by login or the first
    /// heartbeat, never by a message.
    pub fn refresh(&self, username: &str, room: &str, now: DateTime<Utc>) {
        if let Some(mut record) = self.users.get_mut(username) {
            if now > record.last_seen {
                record.last_seen = now;
            }
            record.room = room.to_string();
        }
    }

    /// Record or clear a typing flag. Only records the timestamp; expiry is
    /// applied reader-side, so no stop event is required for correctness.
    pub fn set_typing(&self, username: &str, room: &str, is_typing: bool, now: DateTime<Utc>) {
        let Some(mut record) = self.users.get_mut(username) else {
            return;
        };
        if is_typing {
            if record.typing_since.is_none_or(|prev| now > prev) {
                record.typing_since = Some(now);
            }
            record.typing_room = Some(room.to_string());
        } else {
            record.typing_since = None;
            record.typing_room = None;
        }
    }

    /// Users currently present in a room.
    pub fn list_in_room(&self, room: &str) -> Vec<OnlineUser> {
        self.users
            .iter()
            .filter(|entry| entry.room == room)
            .map(|entry| OnlineUser {
                username: entry.key().clone(),
                geo: entry.geo.clone(),
            })
            .collect()
    }

    /// Usernames whose typing flag for `room` is within the TTL.
    pub fn list_typing_in_room(&self, room: &str, now: DateTime<Utc>) -> Vec<String> {
        let threshold = now - Duration::seconds(TYPING_TTL_SECONDS);
        self.users
            .iter()
            .filter(|entry| {
                entry.typing_room.as_deref() == Some(room)
                    && entry.typing_since.is_some_and(|t| t > threshold)
            })
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Remove a record (explicit logout). Returns whether it existed.
    pub fn remove(&self, username: &str) -> bool {
        self.users.remove(username).is_some()
    }

    /// Evict records idle longer than `idle`, optionally sparing one
    /// username (the heartbeat sweep never removes the caller itself).
    /// Returns the number removed.
    pub fn sweep_inactive(
        &self,
        idle: Duration,
        exclude: Option<&str>,
        now: DateTime<Utc>,
    ) -> usize {
        let threshold = now - idle;
        let before = self.users.len();
        self.users.retain(|username, record| {
            record.last_seen >= threshold || exclude == Some(username.as_str())
        });
        before - self.users.len()
    }

    /// Clone of every record, for the admin views and the export snapshot.
    pub fn snapshot(&self) -> Vec<(String, PresenceRecord)> {
        self.users
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.users.len()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    /// Usernames of every present user (for effect broadcasts).
    pub fn usernames(&self) -> Vec<String> {
        self.users.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}
