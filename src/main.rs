//! Ethereum Fraud Screening - Main Entry Point
//!
//! Loads exported models and serves the screening form over HTTP.

use anyhow::{Context, Result};
use eth_fraud_webapp::{config::AppConfig, web, AppContext};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_tracing(&config)?;

    info!("Starting Ethereum fraud screening service");
    info!(
        production = config.server.production,
        export_root = %config.artifacts.export_root.display(),
        "Configuration loaded successfully"
    );

    let addr = config.bind_addr()?;
    let context = Arc::new(AppContext::build(config)?);
    info!(
        "Inference engine initialized with {} models: {:?}",
        context.engine.model_count(),
        context.engine.model_names()
    );

    let app = web::router(Arc::clone(&context));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Print final summary
    info!("Service shutting down...");
    context.metrics.log_summary();

    Ok(())
}

fn init_tracing(config: &AppConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info")
            .add_directive(format!("eth_fraud_webapp={}", config.log_level()).parse()?),
    };

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.format.eq_ignore_ascii_case("json") {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
