use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::ChatError;
use super::validation;

/// The room every client starts in. Seeded at startup, never removed.
pub const DEFAULT_ROOM: &str = "general";

/// Room visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomPrivacy {
    #[default]
    Public,
    Private,
    Hidden,
}

/// Descriptor for a single chat room.
#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub privacy: RoomPrivacy,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Ordered set of room descriptors. Insertion order is what `list` returns,
/// so the backing store is a locked Vec rather than a sharded map.
pub struct RoomRegistry {
    rooms: RwLock<Vec<Room>>,
}

impl RoomRegistry {
    /// Create a registry with the default "general" room seeded.
    pub fn new() -> Self {
        let general = Room {
            id: DEFAULT_ROOM.to_string(),
            name: "General Chat".to_string(),
            privacy: RoomPrivacy::Public,
            created_by: "system".to_string(),
            created_at: Utc::now(),
        };
        Self {
            rooms: RwLock::new(vec![general]),
        }
    }

    /// Create a room, returning its derived id. An id collision silently
    /// replaces the prior descriptor in place; callers needing strict
    /// uniqueness must check `exists` first.
    pub fn create(
        &self,
        name: &str,
        privacy: RoomPrivacy,
        creator: &str,
    ) -> Result<String, ChatError> {
        validation::validate_room_name(name).map_err(ChatError::Validation)?;

        let id = slugify(name);
        let room = Room {
            id: id.clone(),
            name: name.to_string(),
            privacy,
            created_by: creator.to_string(),
            created_at: Utc::now(),
        };

        let mut rooms = self.rooms.write().unwrap();
        if let Some(existing) = rooms.iter_mut().find(|r| r.id == id) {
            *existing = room;
        } else {
            rooms.push(room);
        }
        drop(rooms);

        info!(room_id = %id, %creator, "room created");
        Ok(id)
    }

    /// All rooms in insertion order.
    pub fn list(&self) -> Vec<Room> {
        self.rooms.read().unwrap().clone()
    }

    pub fn exists(&self, room_id: &str) -> bool {
        self.rooms.read().unwrap().iter().any(|r| r.id == room_id)
    }

    pub fn get(&self, room_id: &str) -> Option<Room> {
        self.rooms
            .read()
            .unwrap()
            .iter()
            .find(|r| r.id == room_id)
            .cloned()
    }

    /// Room ids in insertion order (for broadcasts).
    pub fn ids(&self) -> Vec<String> {
        self.rooms
            .read()
            .unwrap()
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.rooms.read().unwrap().len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a room id from its display name: lowercase, whitespace and
/// underscores become hyphens, everything outside [a-z0-9-] is stripped.
fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '_' { '-' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}
