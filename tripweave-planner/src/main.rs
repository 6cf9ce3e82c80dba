//! tripweave-planner - itinerary generation service
//!
//! Listens on 127.0.0.1:5830 unless configured otherwise.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tripweave_common::config::{load_or_default, resolve_config_path};

use tripweave_planner::config::PlannerConfig;
use tripweave_planner::services::{GeminiClient, GoogleGeocoder};
use tripweave_planner::AppState;

#[derive(Parser, Debug)]
#[command(name = "tripweave-planner")]
#[command(about = "Itinerary generation and repair service")]
#[command(version)]
struct Args {
    /// Address to listen on (host:port)
    #[arg(short, long, env = "TRIPWEAVE_BIND_ADDRESS")]
    bind: Option<String>,

    /// Path to config.toml
    #[arg(short, long, env = "TRIPWEAVE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let toml_config = load_or_default(config_path.as_deref())
        .context("Failed to load configuration file")?;

    let default_filter = toml_config.logging.filter_directive("tripweave_planner");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tripweave-planner v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        Some(path) => info!("Config file {} not found; using defaults", path.display()),
        None => info!("No config directory; using defaults"),
    }

    let config = PlannerConfig::resolve(args.bind.as_deref(), &toml_config);

    let generator = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.request_timeout,
    )
    .context("Failed to build Gemini client")?;
    let geocoder = GoogleGeocoder::new(
        config.geocoding_api_key.clone(),
        config.geocode_requests_per_second,
        std::time::Duration::from_secs(10),
    )
    .context("Failed to build geocoding client")?;

    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, Arc::new(generator), Arc::new(geocoder));
    let app = tripweave_planner::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
