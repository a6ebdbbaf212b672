//! Floor-Plan Analysis Service
//!
//! Detects walls, windows, and doors in uploaded floor-plan images using a
//! pretrained segmentation model served over a REST (Axum) API.

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use planscan::api::rest::{create_router, AppState};
use planscan::config::Config;
use planscan::engine::{loader, PlanDetector, PlanModel};
use planscan::service::PlanService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Starting Floor-Plan Analysis Service v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = Config::load(Config::default_path()).unwrap_or_else(|e| {
        info!("Using default config ({})", e);
        Config::default()
    });
    config.apply_env_overrides();

    info!("Configuration loaded:");
    info!("  Port: {}", config.server.port);
    info!("  Environment: {}", config.server.environment);
    info!("  Device: {}", config.inference.device);
    info!("  Weights: {:?}", config.model.weights_path);

    let state = Arc::new(AppState::<PlanDetector>::new(config.server.environment.clone()));
    let router = create_router(state.clone(), &config.server.allowed_origins);

    // Bind before the model loads so the port answers immediately; handlers
    // report not-ready until the service is published below.
    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("REST API listening on http://{}", addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Startup-phase initialization. Any failure here is fatal: the service
    // never reports ready and the process exits non-zero.
    let weights_path = match loader::ensure_weights(&config.model).await {
        Ok(path) => path,
        Err(e) => {
            error!("Failed to obtain model weights: {:#}", e);
            return Err(e);
        }
    };

    let model = match PlanModel::load(&config.inference, &weights_path) {
        Ok(model) => model,
        Err(e) => {
            error!("Failed to load model: {:#}", e);
            return Err(e);
        }
    };

    let detector = Arc::new(PlanDetector::new(
        Arc::new(model),
        config.inference.confidence_threshold,
    ));
    state.publish(Arc::new(PlanService::new(detector))).await;

    info!("Floor-Plan Analysis Service is ready!");
    info!("Health: http://localhost:{}/health", config.server.port);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    server_handle.abort();

    Ok(())
}
