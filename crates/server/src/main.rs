use std::sync::Arc;

use anyhow::{Context, Result};
use common::config::AppConfig;
use common::logger::setup_logger;
use market_data::{HistoryService, YahooClient};
use strategy::{CnnLstmConfig, InferenceEngine};
use tracing::info;

use crate::api::AppState;
use crate::services::{PredictionConfig, PredictionService};

mod api;
mod services;

#[tokio::main]
async fn main() -> Result<()> {
    setup_logger();

    info!("System starting up...");
    let config = AppConfig::from_env()?;

    let yahoo = YahooClient::new(&config.yahoo_base_url)?;
    let history = HistoryService::new(Arc::new(yahoo), config.synthetic_fallback);

    let pipeline = PredictionConfig::default();
    let model_path = config.model_path.clone();
    let frames = pipeline.sequence.frames;
    let seed = config.model_seed;
    let engine = tokio::task::spawn_blocking(move || {
        InferenceEngine::new(&model_path, frames, CnnLstmConfig::default(), seed)
    })
    .await??;
    info!("Inference backend: {}", engine.backend_name());

    let prediction = PredictionService::new(history, Arc::new(engine), pipeline)?;
    let app = api::router(AppState {
        prediction: Arc::new(prediction),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
