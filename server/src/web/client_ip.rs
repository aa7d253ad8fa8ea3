use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::Extensions;
use axum::http::HeaderMap;
use axum::http::request::Parts;

/// The caller's IP address, the key half of the moderation overlay. It
/// must not be spoofable from arbitrary clients.
///
/// Proxy headers (X-Forwarded-For / X-Real-IP) are trusted only when the
/// direct peer is a loopback address, i.e. the connection comes through a
/// local reverse proxy. Otherwise the actual peer IP is used.
pub struct ClientIp(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(resolve_ip(&parts.headers, &parts.extensions)))
    }
}

/// Shared IP resolution for the extractor and the rate-limit middleware.
pub fn resolve_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    let peer_ip = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0.ip());
    let from_loopback = peer_ip.is_some_and(|ip| ip.is_loopback());

    if from_loopback {
        if let Some(forwarded) = headers.get("x-forwarded-for")
            && let Ok(val) = forwarded.to_str()
            && let Some(first) = val.split(',').next()
        {
            return first.trim().to_string();
        }

        if let Some(real_ip) = headers.get("x-real-ip")
            && let Ok(val) = real_ip.to_str()
        {
            return val.trim().to_string();
        }
    }

    peer_ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
