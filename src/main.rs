//! NoodlePicks web proxy
//!
//! Serves the browser-facing API and forwards every call to the recommendation backend.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use noodlepicks_web::{config::Config, create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting NoodlePicks web proxy");
    tracing::info!("Backend URL: {}", config.backend_url);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Create application state
    let bind_addr = config.bind_addr;
    let state = AppState::new(&config);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
