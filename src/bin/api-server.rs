//! Stockpulse API Server
//!
//! HTTP API over tickers, the backfill queue and stored signals. Runs the
//! daily scheduler in-process unless `SCHEDULER_ENABLED=false`.

use dotenvy::dotenv;
use std::sync::Arc;
use stockpulse::config::AppConfig;
use stockpulse::core::bootstrap::build_services;
use stockpulse::core::http::{start_server, AppState};
use stockpulse::logging;
use stockpulse::metrics::Metrics;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let config = AppConfig::from_env()?;
    info!("Starting Stockpulse API Server");
    info!(environment = %config.environment, "Environment");
    info!(port = config.port, "HTTP Server: http://0.0.0.0:{}", config.port);

    let metrics = Arc::new(Metrics::new()?);
    let services = build_services(&config, metrics.clone()).await?;

    if config.scheduler_enabled {
        services.scheduler.start().await;
        if let Some(next) = services.scheduler.next_run() {
            info!(next_run = %next, cron = %config.collect_schedule, "Daily run scheduled");
        }
    } else {
        info!("Scheduler disabled, daily runs only via POST /api/scheduler");
    }

    let state = AppState::new(metrics)
        .with_storage(services.storage.clone())
        .with_pipeline(services.pipeline.clone())
        .with_queue(services.queue.clone())
        .with_scheduler(services.scheduler.clone())
        .with_policy(config.signal_policy);

    let port = config.port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(state, port).await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("API server started, waiting for shutdown signal...");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down API server...");
            services.scheduler.stop().await;
            info!("API server stopped");
        }
        _ = server_handle => {
            error!("HTTP server stopped");
        }
    }

    Ok(())
}
