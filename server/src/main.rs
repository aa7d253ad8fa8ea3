use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use palaver_server::auth::sessions::SessionStore;
use palaver_server::config::ServerConfig;
use palaver_server::engine::chat_engine::ChatEngine;
use palaver_server::engine::sweeper::spawn_sweeper;
use palaver_server::web::app_state::AppState;
use palaver_server::web::geo::Geolocator;
use palaver_server::web::gif::GifProbe;
use palaver_server::web::router::build_router;

#[derive(Parser)]
#[command(name = "palaver-server", about = "In-memory multi-room chat backend")]
struct Args {
    /// Path to the TOML config file.
    #[arg(long, default_value = "palaver.toml")]
    config: String,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = ServerConfig::load(&args.config);
    let web_addr = config.server.web_address.clone();

    // The shared chat engine, seeded with the "general" room
    let engine = Arc::new(ChatEngine::new());

    // Background sweep: expired effects + long-inactive presence
    spawn_sweeper(
        engine.clone(),
        std::time::Duration::from_secs(config.sweep.interval_secs),
        Duration::minutes(config.sweep.presence_idle_minutes),
    );

    let app_state = Arc::new(AppState {
        engine,
        sessions: SessionStore::new(),
        geolocator: Geolocator::new(),
        gif_probe: GifProbe::new(),
        config,
    });

    let app = build_router(app_state);

    info!("Palaver server starting — Web: {}", web_addr);

    let listener = tokio::net::TcpListener::bind(&web_addr)
        .await
        .expect("failed to bind web listener");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}
