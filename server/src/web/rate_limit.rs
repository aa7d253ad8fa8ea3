use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::engine::rate_limiter::RateLimiter;

use super::client_ip::resolve_ip;

/// Per-IP rate limiters for the endpoint tiers.
pub struct ApiRateLimiters {
    /// Session establishment: tight limit against username churn abuse.
    /// Burst of 10, refill 1 per 6 seconds (~10/minute).
    pub session: RateLimiter,
    /// Poll endpoints: clients legitimately hit several of these once per
    /// second each. Burst of 120, refill 5 per second.
    pub poll: RateLimiter,
    /// Write and admin endpoints: moderate limit.
    /// Burst of 60, refill 1 per second (~60/minute sustained).
    pub api: RateLimiter,
}

impl Default for ApiRateLimiters {
    fn default() -> Self {
        Self {
            session: RateLimiter::new(10, 6.0),
            poll: RateLimiter::new(120, 0.2),
            api: RateLimiter::new(60, 1.0),
        }
    }
}

fn limited(req: &Request<Body>, pick: impl Fn(&ApiRateLimiters) -> &RateLimiter) -> bool {
    let Some(limiters) = req.extensions().get::<Arc<ApiRateLimiters>>() else {
        return false;
    };
    let ip = resolve_ip(req.headers(), req.extensions());
    !pick(limiters).check(&ip)
}

fn too_many() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        "Rate limit exceeded. Please try again later.",
    )
        .into_response()
}

/// Middleware for session-establishment rate limiting.
pub async fn session_rate_limit(req: Request<Body>, next: Next) -> Response {
    if limited(&req, |l| &l.session) {
        return too_many();
    }
    next.run(req).await
}

/// Middleware for poll-endpoint rate limiting.
pub async fn poll_rate_limit(req: Request<Body>, next: Next) -> Response {
    if limited(&req, |l| &l.poll) {
        return too_many();
    }
    next.run(req).await
}

/// Middleware for write/admin rate limiting.
pub async fn api_rate_limit(req: Request<Body>, next: Next) -> Response {
    if limited(&req, |l| &l.api) {
        return too_many();
    }
    next.run(req).await
}
