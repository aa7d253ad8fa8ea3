use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use axum::response::IntoResponse;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::auth::sessions::SESSION_COOKIE;
use crate::engine::chat_engine::RoomSummary;
use crate::engine::error::ChatError;
use crate::engine::messages::MessageView;
use crate::engine::moderation::ModerationStatus;
use crate::engine::presence::{GeoInfo, OnlineUser};
use crate::engine::rooms::DEFAULT_ROOM;
use crate::engine::validation;

use super::app_state::AppState;
use super::auth_middleware::AuthUser;
use super::client_ip::ClientIp;

fn default_room() -> String {
    DEFAULT_ROOM.to_string()
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

// ── Session boundary ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SessionRequest {
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// POST /api/session — establish a username identity.
///
/// The real login UI lives outside this backend; this is the boundary that
/// turns its submitted username into a session token, a profile, and a
/// presence record.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<SessionRequest>,
) -> Result<impl IntoResponse, ChatError> {
    let username = body.username.trim();
    validation::validate_username(username).map_err(ChatError::Validation)?;

    if state.engine.moderation().is_banned(&ip, username) {
        return Err(ChatError::Forbidden("This username is banned".into()));
    }

    let is_moderator = state.config.is_admin_user(username);
    let token = state.sessions.create(username, is_moderator);

    let now = Utc::now();
    let avatar = body.avatar.filter(|a| !a.trim().is_empty());
    state.engine.profiles().ensure(username, avatar, now);

    // Network lookup happens before the presence map is touched.
    let geo = state.geolocator.lookup(&ip).await;
    state
        .engine
        .presence()
        .touch(username, &ip, DEFAULT_ROOM, &user_agent(&headers), geo, now);

    info!(%username, is_moderator, "session established");

    let jar = jar.add(
        Cookie::build((SESSION_COOKIE, token.to_string()))
            .path("/")
            .http_only(true),
    );
    Ok((
        jar,
        Json(json!({ "status": "OK", "username": username, "moderator": is_moderator })),
    ))
}

/// POST /api/logout — drop the session and the presence record.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && let Ok(token) = Uuid::parse_str(cookie.value())
    {
        state.sessions.remove(&token);
    }
    state.engine.presence().remove(&user.username);
    info!(username = %user.username, "logged out");

    (jar.remove(Cookie::from(SESSION_COOKIE)), "OK")
}

// ── Poll surface ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct RoomsResponse {
    pub rooms: Vec<RoomSummary>,
}

/// GET /api/rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<RoomsResponse> {
    Json(RoomsResponse {
        rooms: state.engine.list_rooms(),
    })
}

#[derive(Deserialize)]
pub struct MessagesParams {
    #[serde(default = "default_room")]
    pub room: String,
    #[serde(default)]
    pub after: u64,
}

#[derive(Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageView>,
    pub last_index: u64,
}

/// GET /api/messages?room=R&after=N — cursor-based retrieval. The client
/// stores `last_index` and sends it back as `after` on the next poll.
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MessagesParams>,
) -> Json<MessagesResponse> {
    let (messages, last_index) = state.engine.read_messages(&params.room, params.after);
    Json(MessagesResponse {
        messages,
        last_index,
    })
}

#[derive(Deserialize)]
pub struct RoomParam {
    #[serde(default = "default_room")]
    pub room: String,
}

#[derive(Serialize)]
pub struct OnlineUsersResponse {
    pub users: Vec<OnlineUser>,
}

/// GET /api/online-users?room=R
pub async fn online_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RoomParam>,
) -> Json<OnlineUsersResponse> {
    Json(OnlineUsersResponse {
        users: state.engine.presence().list_in_room(&params.room),
    })
}

#[derive(Serialize)]
pub struct TypingStatusResponse {
    pub typing: Vec<String>,
}

/// GET /api/typing-status?room=R — usernames typing within the last 3 s.
pub async fn typing_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RoomParam>,
) -> Json<TypingStatusResponse> {
    Json(TypingStatusResponse {
        typing: state
            .engine
            .presence()
            .list_typing_in_room(&params.room, Utc::now()),
    })
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CheckEffectsRequest {
    pub username: String,
}

/// POST /api/check-effects — the once-per-second moderation poll. Returns
/// exactly one of banned / active effect / nothing. This is the only
/// channel by which moderation becomes visible to a connected client, so
/// it deliberately works without a session: a banned caller must still get
/// the answer.
pub async fn check_effects(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    Json(body): Json<CheckEffectsRequest>,
) -> Json<serde_json::Value> {
    let username = body.username;

    let response = match state.engine.check_effects(&ip, &username, Utc::now()) {
        ModerationStatus::Banned => {
            if state.engine.moderation().is_ip_banned(&ip) {
                json!({ "banned": true, "ip": ip })
            } else {
                json!({ "banned": true, "username": username })
            }
        }
        ModerationStatus::Effect {
            action,
            color,
            remaining_seconds,
        } => json!({
            "banned": false,
            "effect": action,
            "color": color,
            "duration": remaining_seconds,
        }),
        ModerationStatus::Clear => json!({ "banned": false, "effect": null }),
    };
    Json(response)
}

// ── Write surface ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SendRequest {
    pub text: String,
    #[serde(default = "default_room")]
    pub room: String,
}

/// POST /api/send
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Json(body): Json<SendRequest>,
) -> Result<Json<serde_json::Value>, ChatError> {
    state.engine.guard_banned(&ip, &user.username)?;
    let message_id = state
        .engine
        .send_message(&user.username, &body.room, &body.text, Utc::now())?;
    Ok(Json(json!({ "status": "OK", "message_id": message_id })))
}

#[derive(Deserialize)]
pub struct SendGifRequest {
    pub url: String,
    #[serde(default = "default_room")]
    pub room: String,
}

/// POST /api/send-gif — the URL must pass a live image/gif probe first.
pub async fn send_gif(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Json(body): Json<SendGifRequest>,
) -> Result<Json<serde_json::Value>, ChatError> {
    state.engine.guard_banned(&ip, &user.username)?;

    let url = body.url.trim();
    if url.is_empty() {
        return Err(ChatError::Validation("GIF URL cannot be empty".into()));
    }
    // Probe before any engine state is touched.
    if !state.gif_probe.is_gif_url(url).await {
        return Err(ChatError::Validation("Invalid GIF URL".into()));
    }

    let message_id = state
        .engine
        .send_gif(&user.username, &body.room, url, Utc::now())?;
    Ok(Json(json!({ "status": "OK", "message_id": message_id })))
}

#[derive(Deserialize)]
pub struct DeleteMessageRequest {
    pub message_id: String,
    #[serde(default = "default_room")]
    pub room: String,
}

/// POST /api/delete-message — author or moderator only.
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Json(body): Json<DeleteMessageRequest>,
) -> Result<&'static str, ChatError> {
    state.engine.guard_banned(&ip, &user.username)?;
    state.engine.delete_message(
        &body.room,
        &body.message_id,
        &user.username,
        user.is_moderator,
    )?;
    Ok("OK")
}

#[derive(Deserialize)]
pub struct TypingRequest {
    #[serde(default = "default_room")]
    pub room: String,
    #[serde(default)]
    pub typing: bool,
}

/// POST /api/typing — records the flag; expiry is reader-side.
pub async fn typing(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Json(body): Json<TypingRequest>,
) -> Result<&'static str, ChatError> {
    state.engine.guard_banned(&ip, &user.username)?;
    state
        .engine
        .presence()
        .set_typing(&user.username, &body.room, body.typing, Utc::now());
    Ok("OK")
}

/// POST /api/update-active — the ~30 s presence heartbeat. Creates the
/// record if the caller is new, and opportunistically sweeps *other* users
/// stale past the heartbeat threshold.
pub async fn update_active(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    Json(body): Json<RoomParam>,
) -> Result<&'static str, ChatError> {
    state.engine.guard_banned(&ip, &user.username)?;

    // Geolocation is only consulted when the record is being created, and
    // always before the presence map is touched.
    let geo = if state.engine.presence().contains(&user.username) {
        GeoInfo::unknown()
    } else {
        state.geolocator.lookup(&ip).await
    };

    state.engine.heartbeat(
        &user.username,
        &ip,
        &body.room,
        &user_agent(&headers),
        geo,
        Duration::minutes(state.config.sweep.heartbeat_idle_minutes),
        Utc::now(),
    );
    Ok("OK")
}

#[derive(Deserialize)]
pub struct ThemeRequest {
    pub theme: String,
}

/// POST /api/theme — unknown names fall back to the default.
pub async fn switch_theme(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<ThemeRequest>,
) -> &'static str {
    state.engine.profiles().set_theme(&user.username, &body.theme);
    "OK"
}

#[derive(Deserialize)]
pub struct LayoutRequest {
    pub layout: String,
}

/// POST /api/layout — unknown names fall back to the default.
pub async fn switch_layout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<LayoutRequest>,
) -> &'static str {
    state
        .engine
        .profiles()
        .set_layout(&user.username, &body.layout);
    "OK"
}
