//! Main Entrypoint for the Animus API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Starting the viewer fanout and, when configured, the speech relay.
//! 3. Constructing the Axum router and applying middleware.
//! 4. Starting the web server and handling graceful shutdown.

use animus_api::{
    config::Config,
    relay::{OpenAiRelay, RealtimeRelay},
    router::create_router,
    state::AppState,
    ws::Fanout,
};
use animus_core::CommandGenerator;
use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Services ---
    let relay: Option<Arc<dyn RealtimeRelay>> = match &config.realtime {
        Some(realtime) => {
            info!(model = %realtime.model, voice = %realtime.voice, "Realtime relay enabled.");
            Some(Arc::new(OpenAiRelay::new(realtime.clone())))
        }
        None => {
            warn!("OPENAI_API_KEY not set. Realtime relay endpoints will answer 503.");
            None
        }
    };

    if !config.site_dir.is_dir() {
        warn!(site_dir = %config.site_dir.display(), "Static site directory not found.");
    }

    let app_state = Arc::new(AppState {
        fanout: Fanout::spawn(config.viewer_buffer),
        generator: Arc::new(CommandGenerator::new(config.avatar_target.clone())),
        relay,
        config: Arc::new(config.clone()),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        target_entity = %config.avatar_target,
        viewer_buffer = config.viewer_buffer,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
