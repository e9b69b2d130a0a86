//! Stockpulse Worker
//!
//! Headless daily pipeline: collects candles and classifies every active
//! ticker on the cron schedule. Run it instead of the API server's embedded
//! scheduler, not alongside it.
//!
//! `worker once` runs a single daily pass and exits.

use dotenvy::dotenv;
use std::env;
use std::sync::Arc;
use stockpulse::config::AppConfig;
use stockpulse::core::bootstrap::build_services;
use stockpulse::jobs::types::RunOutcome;
use stockpulse::logging;
use stockpulse::metrics::Metrics;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let config = AppConfig::from_env()?;
    info!("Starting Stockpulse Worker");
    info!(environment = %config.environment, "Environment");

    let metrics = Arc::new(Metrics::new()?);
    let services = build_services(&config, metrics).await?;

    if env::args().nth(1).as_deref() == Some("once") {
        match services.scheduler.run_now().await? {
            RunOutcome::Completed(report) => info!(success = report.success(), "{}", report.summary()),
            RunOutcome::Skipped => warn!("Daily run skipped"),
        }
        return Ok(());
    }

    services.scheduler.start().await;
    if let Some(next) = services.scheduler.next_run() {
        info!(next_run = %next, cron = %config.collect_schedule, "Next daily run at {}", next);
    }

    info!("Worker started, waiting for shutdown signal...");
    signal::ctrl_c().await?;

    info!("Shutting down worker...");
    services.scheduler.stop().await;
    info!("Worker stopped");

    Ok(())
}
