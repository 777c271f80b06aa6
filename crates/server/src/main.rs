//! Predictor server - clinical risk prediction over HTTP
//!
//! Loads every enabled domain's artifacts once at startup and serves
//! predictions, health, readiness and Prometheus metrics.

use anyhow::{Context, Result};
use predictor_lib::{observability::StructuredLogger, PredictionEngine};
use predictor_server::{api, config};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting predictor-server");

    let config = config::ServerConfig::load()?;
    let domains = config.enabled_domains()?;
    info!(instance = %config.instance, port = config.api_port, "Server configured");

    let logger = StructuredLogger::new(&config.instance);
    let domain_names: Vec<String> = domains.iter().map(|d| d.to_string()).collect();
    logger.log_startup(
        SERVER_VERSION,
        &config.artifact_root.display().to_string(),
        &domain_names,
    );

    // Artifacts are loaded on the blocking pool; ONNX optimization is CPU heavy
    let root = config.artifact_root.clone();
    let load_logger = logger.clone();
    let engine = tokio::task::spawn_blocking(move || {
        PredictionEngine::init_global(&root, &domains, &load_logger)
    })
    .await
    .context("Artifact loading task failed")?
    .context("Failed to load model artifacts")?;

    let app_state = Arc::new(api::AppState::new(engine, logger.clone(), SERVER_VERSION));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
    };
    api::serve(config.api_port, app_state, shutdown).await?;

    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
