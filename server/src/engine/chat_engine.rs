use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use super::error::ChatError;
use super::messages::{MessageStore, MessageView, StoredMessage};
use super::moderation::{EffectAction, ModerationOverlay, ModerationStatus, TargetKind};
use super::presence::{GeoInfo, PresenceTracker};
use super::profiles::ProfileStore;
use super::rooms::{Room, RoomPrivacy, RoomRegistry};
use super::validation;

/// Author name attached to admin broadcasts.
pub const SYSTEM_USER: &str = "SYSTEM";

/// The central hub over all shared chat state. Every structure locks
/// independently and each update is its own atomic step. No operation here
/// holds two locks at once, and none of them blocks on I/O.
pub struct ChatEngine {
    rooms: RoomRegistry,
    messages: MessageStore,
    presence: PresenceTracker,
    moderation: ModerationOverlay,
    profiles: ProfileStore,
}

/// A room as listed to clients, with its live occupant count.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub id: String,
    pub name: String,
    pub privacy: RoomPrivacy,
    pub user_count: usize,
    pub created_by: String,
}

/// An active user as shown in the admin views.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveUserInfo {
    pub username: String,
    pub ip: String,
    pub geo: GeoInfo,
    pub room: String,
    pub last_seen: DateTime<Utc>,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub total_users: usize,
    pub total_messages: usize,
    pub total_gifs: usize,
    pub total_rooms: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugInfo {
    pub system_stats: SystemStats,
    pub banned_users: Vec<String>,
    pub banned_ips: Vec<String>,
    pub active_effects: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomMessages {
    pub room: String,
    pub room_name: String,
    pub messages: Vec<MessageView>,
}

/// Full snapshot of rooms, presence, bans, and all messages.
#[derive(Debug, Clone, Serialize)]
pub struct ExportData {
    pub timestamp: DateTime<Utc>,
    pub exported_by: String,
    pub system_stats: SystemStats,
    pub rooms: Vec<Room>,
    pub active_users: Vec<ActiveUserInfo>,
    pub banned_users: Vec<String>,
    pub banned_ips: Vec<String>,
    pub messages_by_room: Vec<RoomMessages>,
}

impl ChatEngine {
    /// Create an engine with the default "general" room seeded.
    pub fn new() -> Self {
        Self {
            rooms: RoomRegistry::new(),
            messages: MessageStore::new(),
            presence: PresenceTracker::new(),
            moderation: ModerationOverlay::new(),
            profiles: ProfileStore::new(),
        }
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn moderation(&self) -> &ModerationOverlay {
        &self.moderation
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    // ── Poll surface ────────────────────────────────────────────────

    /// All rooms in creation order, each with its live occupant count.
    pub fn list_rooms(&self) -> Vec<RoomSummary> {
        self.rooms
            .list()
            .into_iter()
            .map(|room| {
                let user_count = self.presence.list_in_room(&room.id).len();
                RoomSummary {
                    id: room.id,
                    name: room.name,
                    privacy: room.privacy,
                    user_count,
                    created_by: room.created_by,
                }
            })
            .collect()
    }

    /// Messages in `room` from the client's cursor, plus the new cursor.
    pub fn read_messages(&self, room: &str, after: u64) -> (Vec<MessageView>, u64) {
        self.messages.read_since(room, after)
    }

    /// The poll-time moderation check: banned, effect, or clear.
    pub fn check_effects(&self, ip: &str, username: &str, now: DateTime<Utc>) -> ModerationStatus {
        self.moderation.check(ip, username, now)
    }

    /// Reject hard-banned callers before any state is touched.
    pub fn guard_banned(&self, ip: &str, username: &str) -> Result<(), ChatError> {
        if self.moderation.is_banned(ip, username) {
            return Err(ChatError::Forbidden("You are banned".into()));
        }
        Ok(())
    }

    // ── Write surface ───────────────────────────────────────────────

    /// Append a text message. Refreshes the sender's presence (but never
    /// creates it; login and heartbeats do that). Returns the message id.
    pub fn send_message(
        &self,
        username: &str,
        room: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<String, ChatError> {
        let text = text.trim();
        validation::validate_message(text).map_err(ChatError::Validation)?;
        self.require_room(room)?;

        self.presence.refresh(username, room, now);

        let id = generate_message_id();
        let offset = self.messages.append(
            room,
            StoredMessage {
                id: id.clone(),
                author: username.to_string(),
                sent_at: now,
                text: validation::escape_html(text),
                gif_url: None,
            },
        );
        info!(%room, %username, offset, "message sent");
        Ok(id)
    }

    /// Append a GIF message. The URL must already have passed the live
    /// content-type probe; that network call happens before any lock here.
    pub fn send_gif(
        &self,
        username: &str,
        room: &str,
        gif_url: &str,
        now: DateTime<Utc>,
    ) -> Result<String, ChatError> {
        if gif_url.trim().is_empty() {
            return Err(ChatError::Validation("GIF URL cannot be empty".into()));
        }
        self.require_room(room)?;

        self.presence.refresh(username, room, now);

        let id = generate_message_id();
        self.messages.append(
            room,
            StoredMessage {
                id: id.clone(),
                author: username.to_string(),
                sent_at: now,
                text: format!("[GIF shared by {username}]"),
                gif_url: Some(gif_url.trim().to_string()),
            },
        );
        info!(%room, %username, "gif sent");
        Ok(id)
    }

    /// Soft-delete a message. Owner or moderator only.
    pub fn delete_message(
        &self,
        room: &str,
        message_id: &str,
        requester: &str,
        is_moderator: bool,
    ) -> Result<(), ChatError> {
        let author = self
            .messages
            .author_of(room, message_id)
            .ok_or_else(|| ChatError::NotFound(format!("Message not found: {message_id}")))?;

        if author != requester && !is_moderator {
            return Err(ChatError::Forbidden(
                "You can only delete your own messages".into(),
            ));
        }

        self.messages.soft_delete(room, message_id);
        info!(%room, %message_id, %requester, "message deleted");
        Ok(())
    }

    /// Presence heartbeat: create-or-refresh the caller's record, then
    /// opportunistically evict other users idle past `sweep_idle`.
    #[allow(clippy::too_many_arguments)]
    pub fn heartbeat(
        &self,
        username: &str,
        ip: &str,
        room: &str,
        user_agent: &str,
        geo: GeoInfo,
        sweep_idle: Duration,
        now: DateTime<Utc>,
    ) -> usize {
        self.presence.touch(username, ip, room, user_agent, geo, now);
        self.presence.sweep_inactive(sweep_idle, Some(username), now)
    }

    // ── Moderation surface ──────────────────────────────────────────

    pub fn create_room(
        &self,
        name: &str,
        privacy: RoomPrivacy,
        creator: &str,
    ) -> Result<String, ChatError> {
        self.rooms.create(name, privacy, creator)
    }

    /// Soft-delete every message by `target` in `room`. Returns the count.
    pub fn delete_user_messages(&self, room: &str, target: &str) -> usize {
        let count = self.messages.delete_all_by_author(room, target);
        info!(%room, %target, count, "user messages deleted");
        count
    }

    /// Physically empty a room's buffer.
    pub fn clear_room(&self, room: &str) {
        self.messages.clear_room(room);
        info!(%room, "room cleared");
    }

    /// Append a SYSTEM announcement to every room. Returns the room count.
    pub fn global_message(&self, text: &str, now: DateTime<Utc>) -> Result<usize, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::Validation("Message cannot be empty".into()));
        }
        let body = format!(
            "\u{1F4E2} GLOBAL ANNOUNCEMENT: {}",
            validation::escape_html(text)
        );
        let rooms = self.broadcast(&body, now);
        info!(rooms, "global announcement sent");
        Ok(rooms)
    }

    /// Append an admin message addressed to one user, visible in every room.
    pub fn message_user(
        &self,
        target: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, ChatError> {
        let text = text.trim();
        if target.trim().is_empty() || text.is_empty() {
            return Err(ChatError::Validation(
                "Target and message are required".into(),
            ));
        }
        let body = format!(
            "\u{1F4E2} To {}: [ADMIN MESSAGE] {}",
            validation::escape_html(target.trim()),
            validation::escape_html(text)
        );
        Ok(self.broadcast(&body, now))
    }

    fn broadcast(&self, body: &str, now: DateTime<Utc>) -> usize {
        let room_ids = self.rooms.ids();
        for room_id in &room_ids {
            self.messages.append(
                room_id,
                StoredMessage {
                    id: generate_message_id(),
                    author: SYSTEM_USER.to_string(),
                    sent_at: now,
                    text: body.to_string(),
                    gif_url: None,
                },
            );
        }
        room_ids.len()
    }

    /// Apply a 5-second red blink effect to every active user. Returns how
    /// many users were hit.
    pub fn force_reconnect(&self, applied_by: &str, now: DateTime<Utc>) -> usize {
        let usernames = self.presence.usernames();
        for username in &usernames {
            self.moderation.set_effect(
                TargetKind::User,
                username,
                EffectAction::Blink,
                "#ff0000",
                5,
                applied_by,
                now,
            );
        }
        info!(count = usernames.len(), %applied_by, "force reconnect");
        usernames.len()
    }

    // ── Admin views ─────────────────────────────────────────────────

    pub fn active_users(&self) -> Vec<ActiveUserInfo> {
        self.presence
            .snapshot()
            .into_iter()
            .map(|(username, record)| ActiveUserInfo {
                username,
                ip: record.ip,
                geo: record.geo,
                room: record.room,
                last_seen: record.last_seen,
                user_agent: record.user_agent.chars().take(50).collect(),
            })
            .collect()
    }

    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            system_stats: self.system_stats(),
            banned_users: self.moderation.banned_users(),
            banned_ips: self.moderation.banned_ips(),
            active_effects: self.moderation.effect_summaries(),
        }
    }

    /// All rooms' windows, deletion overlay resolved.
    pub fn export_messages(&self) -> Vec<RoomMessages> {
        self.messages
            .export_all()
            .into_iter()
            .map(|(room_id, messages)| {
                let room_name = self
                    .rooms
                    .get(&room_id)
                    .map(|r| r.name)
                    .unwrap_or_else(|| room_id.clone());
                RoomMessages {
                    room: room_id,
                    room_name,
                    messages,
                }
            })
            .collect()
    }

    pub fn export_data(&self, exported_by: &str, now: DateTime<Utc>) -> ExportData {
        ExportData {
            timestamp: now,
            exported_by: exported_by.to_string(),
            system_stats: self.system_stats(),
            rooms: self.rooms.list(),
            active_users: self.active_users(),
            banned_users: self.moderation.banned_users(),
            banned_ips: self.moderation.banned_ips(),
            messages_by_room: self.export_messages(),
        }
    }

    fn system_stats(&self) -> SystemStats {
        SystemStats {
            total_users: self.presence.count(),
            total_messages: self.messages.message_count(),
            total_gifs: self.messages.gif_count(),
            total_rooms: self.rooms.count(),
        }
    }

    fn require_room(&self, room: &str) -> Result<(), ChatError> {
        if room.trim().is_empty() {
            return Err(ChatError::Validation("Room is required".into()));
        }
        if !self.rooms.exists(room) {
            return Err(ChatError::NotFound(format!("No such room: {room}")));
        }
        Ok(())
    }
}

impl Default for ChatEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// 16-hex-char globally unique message id.
fn generate_message_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}
