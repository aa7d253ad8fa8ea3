use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use super::app_state::AppState;
use super::rate_limit::{ApiRateLimiters, api_rate_limit, poll_rate_limit, session_rate_limit};
use super::{admin_api, rest_api};

/// Build the axum router with all HTTP routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Restrict CORS to the configured public_url origin (or allow any for localhost dev)
    let public_url = &state.config.server.public_url;
    let cors = if public_url.contains("localhost") || public_url.contains("127.0.0.1") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origin = public_url
            .parse::<HeaderValue>()
            .unwrap_or_else(|_| HeaderValue::from_static("https://localhost"));
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let rate_limiters = Arc::new(ApiRateLimiters::default());

    // Session boundary — tight rate limit against username churn
    let session_routes = Router::new()
        .route("/api/session", post(rest_api::create_session))
        .route("/api/logout", post(rest_api::logout))
        .layer(axum::middleware::from_fn(session_rate_limit));

    // Poll surface — clients hit these once per second each
    let poll_routes = Router::new()
        .route("/api/rooms", get(rest_api::get_rooms))
        .route("/api/messages", get(rest_api::get_messages))
        .route("/api/online-users", get(rest_api::online_users))
        .route("/api/typing-status", get(rest_api::typing_status))
        .route("/api/check-effects", post(rest_api::check_effects))
        .layer(axum::middleware::from_fn(poll_rate_limit));

    // Write surface + moderation — general rate limit
    let api_routes = Router::new()
        .route("/api/send", post(rest_api::send_message))
        .route("/api/send-gif", post(rest_api::send_gif))
        .route("/api/delete-message", post(rest_api::delete_message))
        .route("/api/typing", post(rest_api::typing))
        .route("/api/update-active", post(rest_api::update_active))
        .route("/api/theme", post(rest_api::switch_theme))
        .route("/api/layout", post(rest_api::switch_layout))
        .route("/api/admin/create-room", post(admin_api::create_room))
        .route("/api/admin/screen-effect", post(admin_api::screen_effect))
        .route("/api/admin/clear-effect", post(admin_api::clear_effect))
        .route("/api/admin/ban", post(admin_api::ban))
        .route("/api/admin/mass-unban", post(admin_api::mass_unban))
        .route("/api/admin/active-users", get(admin_api::active_users))
        .route("/api/admin/debug-info", get(admin_api::debug_info))
        .route(
            "/api/admin/manage-messages",
            post(admin_api::manage_messages),
        )
        .route("/api/admin/export-data", get(admin_api::export_data))
        .route(
            "/api/admin/global-message",
            post(admin_api::global_message),
        )
        .route("/api/admin/message-user", post(admin_api::message_user))
        .route(
            "/api/admin/force-reconnect",
            post(admin_api::force_reconnect),
        )
        .layer(axum::middleware::from_fn(api_rate_limit));

    Router::new()
        .merge(session_routes)
        .merge(poll_routes)
        .merge(api_routes)
        .layer(cors)
        // Inject rate limiters into all request extensions
        .layer(axum::Extension(rate_limiters))
        .with_state(state)
}
