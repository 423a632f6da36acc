//! pubsub-hub server entry point.
//!
//! Starts the Axum HTTP server with the subscribe, publish and static
//! endpoints.

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pubsub_hub::api;
use pubsub_hub::app_state::AppState;
use pubsub_hub::config::{HubConfig, LogFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = HubConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting pubsub-hub");

    // Build application state
    let app_state = AppState::new();

    // Build router
    let app = api::build_router(&config.static_dir)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(
        addr = %config.listen_addr,
        static_dir = %config.static_dir.display(),
        "listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}
