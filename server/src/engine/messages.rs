use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use serde::Serialize;

/// Fixed capacity of each room's ring buffer. Once full, the oldest message
/// is evicted on insert; eviction never renumbers offsets.
pub const ROOM_LOG_CAPACITY: usize = 500;

/// Text substituted for soft-deleted messages on every read path.
pub const DELETED_PLACEHOLDER: &str = "[Message deleted]";

/// A message as stored in a room's log. Never mutated after append;
/// deletion shadows it through the overlay instead.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: String,
    pub author: String,
    pub sent_at: DateTime<Utc>,
    /// HTML-escaped before it gets here.
    pub text: String,
    pub gif_url: Option<String>,
}

/// A message as returned to readers, with the deletion overlay resolved.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: String,
    /// Wall-clock send time, HH:MM:SS.
    pub time: String,
    pub user: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gif_url: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

/// One room's bounded, append-only log. `total` counts every message ever
/// appended to the room and never decreases; the deque holds the newest
/// `ROOM_LOG_CAPACITY` of them.
#[derive(Debug, Default)]
struct RoomLog {
    total: u64,
    entries: VecDeque<StoredMessage>,
}

/// Per-room message logs plus the soft-delete overlay. The overlay is a
/// separate id set so deletion can race freely against reads and appends
/// without touching a log's lock.
pub struct MessageStore {
    logs: DashMap<String, RoomLog>,
    deleted: DashSet<String>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            logs: DashMap::new(),
            deleted: DashSet::new(),
        }
    }

    /// Append a message, returning the room's new cumulative offset.
    /// Offsets assigned by concurrent appends to the same room reflect real
    /// append order (the room's map entry is locked for the duration).
    pub fn append(&self, room_id: &str, message: StoredMessage) -> u64 {
        let mut log = self.logs.entry(room_id.to_string()).or_default();
        if log.entries.len() == ROOM_LOG_CAPACITY {
            log.entries.pop_front();
        }
        log.entries.push_back(message);
        log.total += 1;
        log.total
    }

    /// Return every message at or past the absolute offset `after`, plus the
    /// room's current cumulative offset for the client to store and resend.
    ///
    /// A cursor that predates the current window clamps to the window start:
    /// a client who stalls past 500 evictions silently loses that history.
    /// No gap detection is attempted.
    pub fn read_since(&self, room_id: &str, after: u64) -> (Vec<MessageView>, u64) {
        let Some(log) = self.logs.get(room_id) else {
            return (Vec::new(), 0);
        };

        let window_start = log.total - log.entries.len() as u64;
        let skip = after.saturating_sub(window_start).min(log.entries.len() as u64) as usize;

        let views = log
            .entries
            .iter()
            .skip(skip)
            .map(|m| self.resolve(m))
            .collect();
        (views, log.total)
    }

    /// Resolve a stored message against the deletion overlay.
    fn resolve(&self, message: &StoredMessage) -> MessageView {
        let deleted = self.deleted.contains(&message.id);
        MessageView {
            id: message.id.clone(),
            time: message.sent_at.format("%H:%M:%S").to_string(),
            user: message.author.clone(),
            text: if deleted {
                DELETED_PLACEHOLDER.to_string()
            } else {
                message.text.clone()
            },
            gif_url: message.gif_url.clone(),
            deleted,
        }
    }

    /// The author of a message, if it is still in the room's window.
    pub fn author_of(&self, room_id: &str, message_id: &str) -> Option<String> {
        self.logs.get(room_id)?.entries.iter().find_map(|m| {
            if m.id == message_id {
                Some(m.author.clone())
            } else {
                None
            }
        })
    }

    /// Mark a message deleted. Returns false if the message is not in the
    /// room's current window. Authorization is the caller's job.
    pub fn soft_delete(&self, room_id: &str, message_id: &str) -> bool {
        let exists = self
            .logs
            .get(room_id)
            .map(|log| log.entries.iter().any(|m| m.id == message_id))
            .unwrap_or(false);
        if exists {
            self.deleted.insert(message_id.to_string());
        }
        exists
    }

    /// Soft-delete every message by `author` in a room. Returns the count.
    pub fn delete_all_by_author(&self, room_id: &str, author: &str) -> usize {
        let Some(log) = self.logs.get(room_id) else {
            return 0;
        };
        let ids: Vec<String> = log
            .entries
            .iter()
            .filter(|m| m.author == author)
            .map(|m| m.id.clone())
            .collect();
        drop(log);

        let count = ids.len();
        for id in ids {
            self.deleted.insert(id);
        }
        count
    }

    /// Physically empty a room's buffer. The cumulative offset keeps
    /// counting, so client cursors stay valid.
    pub fn clear_room(&self, room_id: &str) {
        if let Some(mut log) = self.logs.get_mut(room_id) {
            log.entries.clear();
        }
    }

    /// Snapshot of every room's window, deletion overlay resolved. Soft-
    /// deleted text is not exposed here either.
    pub fn export_all(&self) -> Vec<(String, Vec<MessageView>)> {
        self.logs
            .iter()
            .map(|entry| {
                let views = entry.entries.iter().map(|m| self.resolve(m)).collect();
                (entry.key().clone(), views)
            })
            .collect()
    }

    /// Messages currently buffered across all rooms.
    pub fn message_count(&self) -> usize {
        self.logs.iter().map(|log| log.entries.len()).sum()
    }

    /// Buffered messages carrying a GIF attachment.
    pub fn gif_count(&self) -> usize {
        self.logs
            .iter()
            .map(|log| log.entries.iter().filter(|m| m.gif_url.is_some()).count())
            .sum()
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, author: &str, text: &str) -> StoredMessage {
        StoredMessage {
            id: id.to_string(),
            author: author.to_string(),
            sent_at: Utc::now(),
            text: text.to_string(),
            gif_url: None,
        }
    }

    #[test]
    fn test_offsets_increase_by_one() {
        let store = MessageStore::new();
        for i in 1..=10u64 {
            let offset = store.append("general", msg(&format!("m{i}"), "alice", "hi"));
            assert_eq!(offset, i);
        }
    }

    #[test]
    fn test_offsets_independent_across_rooms() {
        let store = MessageStore::new();
        assert_eq!(store.append("a", msg("1", "x", "hi")), 1);
        assert_eq!(store.append("b", msg("2", "x", "hi")), 1);
        assert_eq!(store.append("a", msg("3", "x", "hi")), 2);
    }

    #[test]
    fn test_read_since_cursor_contract() {
        let store = MessageStore::new();
        let (messages, offset) = store.read_since("general", 0);
        assert!(messages.is_empty());
        assert_eq!(offset, 0);

        for i in 0..5 {
            store.append("general", msg(&format!("m{i}"), "alice", &format!("t{i}")));
        }

        let (messages, offset) = store.read_since("general", 0);
        assert_eq!(messages.len(), 5);
        assert_eq!(offset, 5);

        // Re-polling from the returned offset yields nothing new.
        let (messages, offset) = store.read_since("general", 5);
        assert!(messages.is_empty());
        assert_eq!(offset, 5);

        let (messages, _) = store.read_since("general", 3);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "t3");
    }

    #[test]
    fn test_eviction_keeps_cumulative_offset() {
        let store = MessageStore::new();
        for i in 0..501 {
            store.append("busy", msg(&format!("m{i}"), "alice", &format!("t{i}")));
        }

        let (messages, offset) = store.read_since("busy", 0);
        assert_eq!(offset, 501);
        assert_eq!(messages.len(), ROOM_LOG_CAPACITY);
        // Oldest evicted: window starts at the second message.
        assert_eq!(messages[0].text, "t1");
        assert_eq!(messages.last().unwrap().text, "t500");
    }

    #[test]
    fn test_stalled_cursor_clamps_to_window() {
        let store = MessageStore::new();
        for i in 0..600 {
            store.append("busy", msg(&format!("m{i}"), "alice", &format!("t{i}")));
        }
        // Cursor 50 predates the window (100..600); client sees what remains.
        let (messages, offset) = store.read_since("busy", 50);
        assert_eq!(messages.len(), ROOM_LOG_CAPACITY);
        assert_eq!(messages[0].text, "t100");
        assert_eq!(offset, 600);

        // A fresh cursor past eviction still tracks new appends correctly.
        store.append("busy", msg("new", "bob", "latest"));
        let (messages, offset) = store.read_since("busy", 600);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "latest");
        assert_eq!(offset, 601);
    }

    #[test]
    fn test_soft_delete_shadows_text() {
        let store = MessageStore::new();
        store.append("general", msg("target", "alice", "secret"));
        store.append("general", msg("other", "bob", "visible"));

        assert!(store.soft_delete("general", "target"));

        let (messages, _) = store.read_since("general", 0);
        let deleted = messages.iter().find(|m| m.id == "target").unwrap();
        assert!(deleted.deleted);
        assert_eq!(deleted.text, DELETED_PLACEHOLDER);
        // Original text is gone from every read path.
        assert!(!messages.iter().any(|m| m.text.contains("secret")));
        assert!(
            !store
                .export_all()
                .iter()
                .any(|(_, msgs)| msgs.iter().any(|m| m.text.contains("secret")))
        );

        let untouched = messages.iter().find(|m| m.id == "other").unwrap();
        assert!(!untouched.deleted);
        assert_eq!(untouched.text, "visible");
    }

    #[test]
    fn test_soft_delete_missing_message() {
        let store = MessageStore::new();
        store.append("general", msg("m1", "alice", "hi"));
        assert!(!store.soft_delete("general", "nope"));
        assert!(!store.soft_delete("empty-room", "m1"));
    }

    #[test]
    fn test_delete_all_by_author() {
        let store = MessageStore::new();
        store.append("general", msg("a1", "alice", "one"));
        store.append("general", msg("b1", "bob", "two"));
        store.append("general", msg("a2", "alice", "three"));

        assert_eq!(store.delete_all_by_author("general", "alice"), 2);

        let (messages, _) = store.read_since("general", 0);
        assert!(messages.iter().filter(|m| m.user == "alice").all(|m| m.deleted));
        assert!(!messages.iter().find(|m| m.id == "b1").unwrap().deleted);
    }

    #[test]
    fn test_clear_room_preserves_offsets() {
        let store = MessageStore::new();
        for i in 0..3 {
            store.append("general", msg(&format!("m{i}"), "alice", "hi"));
        }
        store.clear_room("general");

        let (messages, offset) = store.read_since("general", 0);
        assert!(messages.is_empty());
        assert_eq!(offset, 3);

        // Appending after a clear continues the count.
        assert_eq!(store.append("general", msg("m3", "alice", "back")), 4);
    }

    #[test]
    fn test_author_lookup() {
        let store = MessageStore::new();
        store.append("general", msg("m1", "alice", "hi"));
        assert_eq!(store.author_of("general", "m1").as_deref(), Some("alice"));
        assert_eq!(store.author_of("general", "m2"), None);
        assert_eq!(store.author_of("other", "m1"), None);
    }

    #[test]
    fn test_counts() {
        let store = MessageStore::new();
        store.append("a", msg("1", "x", "hi"));
        let mut with_gif = msg("2", "x", "[GIF shared by x]");
        with_gif.gif_url = Some("http://example.com/a.gif".into());
        store.append("b", with_gif);

        assert_eq!(store.message_count(), 2);
        assert_eq!(store.gif_count(), 1);
    }
}
