use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::engine::error::ChatError;
use crate::engine::moderation::{EffectAction, TargetKind};
use crate::engine::rooms::{DEFAULT_ROOM, RoomPrivacy};

use super::app_state::AppState;
use super::auth_middleware::Moderator;

fn default_room() -> String {
    DEFAULT_ROOM.to_string()
}

#[derive(Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(default)]
    pub privacy: RoomPrivacy,
}

/// POST /api/admin/create-room
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Moderator(user): Moderator,
    Json(body): Json<CreateRoomRequest>,
) -> Result<&'static str, ChatError> {
    state
        .engine
        .create_room(body.name.trim(), body.privacy, &user.username)?;
    Ok("OK")
}

fn default_color() -> String {
    "#000000".to_string()
}

#[derive(Deserialize)]
pub struct ScreenEffectRequest {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub identifier: String,
    pub action: EffectAction,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub duration: u64,
}

/// POST /api/admin/screen-effect — duration 0 means no expiry.
pub async fn screen_effect(
    State(state): State<Arc<AppState>>,
    Moderator(user): Moderator,
    Json(body): Json<ScreenEffectRequest>,
) -> Result<&'static str, ChatError> {
    let identifier = body.identifier.trim();
    if identifier.is_empty() {
        return Err(ChatError::Validation("Invalid identifier".into()));
    }
    state.engine.moderation().set_effect(
        body.kind,
        identifier,
        body.action,
        &body.color,
        body.duration,
        &user.username,
        Utc::now(),
    );
    Ok("OK")
}

#[derive(Deserialize)]
pub struct ClearEffectRequest {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub identifier: String,
}

/// POST /api/admin/clear-effect
pub async fn clear_effect(
    State(state): State<Arc<AppState>>,
    Moderator(_user): Moderator,
    Json(body): Json<ClearEffectRequest>,
) -> Result<&'static str, ChatError> {
    let identifier = body.identifier.trim();
    if identifier.is_empty() {
        return Err(ChatError::Validation("Invalid identifier".into()));
    }
    state.engine.moderation().clear_effect(body.kind, identifier);
    Ok("OK")
}

fn default_reason() -> String {
    "No reason provided".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct BanRequest {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub identifier: String,
    #[serde(default = "default_reason")]
    pub reason: String,
    #[serde(default = "default_true")]
    pub ban: bool,
}

/// POST /api/admin/ban — `ban: false` performs an unban.
pub async fn ban(
    State(state): State<Arc<AppState>>,
    Moderator(user): Moderator,
    Json(body): Json<BanRequest>,
) -> Result<&'static str, ChatError> {
    let identifier = body.identifier.trim();
    if identifier.is_empty() {
        return Err(ChatError::Validation("Invalid identifier".into()));
    }
    if body.ban {
        state
            .engine
            .moderation()
            .ban(body.kind, identifier, &body.reason, &user.username);
    } else {
        state
            .engine
            .moderation()
            .unban(body.kind, identifier, &user.username);
    }
    Ok("OK")
}

/// POST /api/admin/mass-unban — clears all four moderation maps.
pub async fn mass_unban(
    State(state): State<Arc<AppState>>,
    Moderator(user): Moderator,
) -> &'static str {
    state.engine.moderation().mass_unban(&user.username);
    "OK"
}

/// GET /api/admin/active-users
pub async fn active_users(
    State(state): State<Arc<AppState>>,
    Moderator(_user): Moderator,
) -> Json<serde_json::Value> {
    Json(json!({ "users": state.engine.active_users() }))
}

/// GET /api/admin/debug-info
pub async fn debug_info(
    State(state): State<Arc<AppState>>,
    Moderator(_user): Moderator,
) -> impl IntoResponse {
    Json(state.engine.debug_info())
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManageAction {
    Delete,
    Clear,
    Export,
}

#[derive(Deserialize)]
pub struct ManageMessagesRequest {
    pub action: ManageAction,
    #[serde(default)]
    pub target: String,
    #[serde(default = "default_room")]
    pub room: String,
}

/// POST /api/admin/manage-messages — bulk message operations.
pub async fn manage_messages(
    State(state): State<Arc<AppState>>,
    Moderator(_user): Moderator,
    Json(body): Json<ManageMessagesRequest>,
) -> Response {
    match body.action {
        ManageAction::Delete => {
            let deleted = state.engine.delete_user_messages(&body.room, &body.target);
            Json(json!({ "deleted": deleted })).into_response()
        }
        ManageAction::Clear => {
            state.engine.clear_room(&body.room);
            "OK".into_response()
        }
        ManageAction::Export => Json(state.engine.export_messages()).into_response(),
    }
}

/// GET /api/admin/export-data — full snapshot of rooms, presence, bans,
/// and all messages.
pub async fn export_data(
    State(state): State<Arc<AppState>>,
    Moderator(user): Moderator,
) -> impl IntoResponse {
    Json(state.engine.export_data(&user.username, Utc::now()))
}

#[derive(Deserialize)]
pub struct GlobalMessageRequest {
    pub message: String,
}

/// POST /api/admin/global-message — SYSTEM announcement in every room.
pub async fn global_message(
    State(state): State<Arc<AppState>>,
    Moderator(_user): Moderator,
    Json(body): Json<GlobalMessageRequest>,
) -> Result<&'static str, ChatError> {
    state.engine.global_message(&body.message, Utc::now())?;
    Ok("OK")
}

#[derive(Deserialize)]
pub struct MessageUserRequest {
    pub username: String,
    pub message: String,
}

/// POST /api/admin/message-user — admin note addressed to one user.
pub async fn message_user(
    State(state): State<Arc<AppState>>,
    Moderator(_user): Moderator,
    Json(body): Json<MessageUserRequest>,
) -> Result<&'static str, ChatError> {
    state
        .engine
        .message_user(&body.username, &body.message, Utc::now())?;
    Ok("OK")
}

/// POST /api/admin/force-reconnect — 5 s blink effect on every active user.
pub async fn force_reconnect(
    State(state): State<Arc<AppState>>,
    Moderator(user): Moderator,
) -> Json<serde_json::Value> {
    let affected = state.engine.force_reconnect(&user.username, Utc::now());
    Json(json!({ "status": "OK", "affected": affected }))
}
