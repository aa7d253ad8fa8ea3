use std::sync::Arc;

use crate::auth::sessions::SessionStore;
use crate::config::ServerConfig;
use crate::engine::chat_engine::ChatEngine;

use super::geo::Geolocator;
use super::gif::GifProbe;

/// Shared state injected into every handler.
pub struct AppState {
    pub engine: Arc<ChatEngine>,
    pub sessions: SessionStore,
    pub geolocator: Geolocator,
    pub gif_probe: GifProbe,
    pub config: ServerConfig,
}
