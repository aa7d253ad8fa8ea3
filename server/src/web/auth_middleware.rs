use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::auth::sessions::SESSION_COOKIE;
use crate::engine::error::ChatError;

use super::app_state::AppState;

/// Extractor that resolves the session cookie to an identity. Use this in
/// any handler that requires an established username.
pub struct AuthUser {
    pub username: String,
    pub is_moderator: bool,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .unwrap(); // CookieJar extraction is infallible

        let cookie = jar
            .get(SESSION_COOKIE)
            .ok_or_else(|| ChatError::Auth.into_response())?;

        let token = Uuid::parse_str(cookie.value()).map_err(|_| ChatError::Auth.into_response())?;

        let identity = state
            .sessions
            .get(&token)
            .ok_or_else(|| ChatError::Auth.into_response())?;

        Ok(AuthUser {
            username: identity.username,
            is_moderator: identity.is_moderator,
        })
    }
}

/// Extractor for moderation-privileged endpoints. Unauthorized callers are
/// rejected with no side effect.
pub struct Moderator(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for Moderator {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_moderator {
            return Err(
                ChatError::Forbidden("Moderator privilege required".into()).into_response(),
            );
        }
        Ok(Moderator(user))
    }
}
