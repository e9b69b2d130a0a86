//! Wiring shared by the binaries

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::core::scheduler::DailyScheduler;
use crate::db::{MemoryStorage, PostgresDatabase, Storage};
use crate::jobs::context::JobContext;
use crate::jobs::pipeline::SignalPipeline;
use crate::jobs::ticker_queue::TickerInitQueue;
use crate::metrics::Metrics;
use crate::services::kis::KisClient;
use crate::services::notifier::{LogNotifier, Notifier, WebhookNotifier};
use crate::signals::engine::SignalAnalyzer;

pub struct Services {
    pub storage: Arc<dyn Storage>,
    pub pipeline: Arc<SignalPipeline>,
    pub queue: Arc<TickerInitQueue>,
    pub scheduler: Arc<DailyScheduler>,
}

/// Connect storage, build the KIS client and assemble the job graph
pub async fn build_services(
    config: &AppConfig,
    metrics: Arc<Metrics>,
) -> Result<Services, Box<dyn std::error::Error>> {
    let storage: Arc<dyn Storage> = match &config.database_url {
        Some(url) => {
            info!("Initializing PostgreSQL connection...");
            let db = PostgresDatabase::connect(url).await?;
            metrics
                .database_connected
                .set(if db.is_connected().await { 1 } else { 0 });
            Arc::new(db)
        }
        None => {
            warn!("DATABASE_URL is not set, using in-memory storage (data is lost on exit)");
            Arc::new(MemoryStorage::new())
        }
    };
    storage.init_schema().await?;

    let kis = KisClient::new(&config.kis)?.with_metrics(metrics.clone());

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => Arc::new(LogNotifier),
    };

    info!(policy = %config.signal_policy, "Signal policy: {}", config.signal_policy);
    let ctx = Arc::new(
        JobContext::new(
            Arc::new(kis),
            storage.clone(),
            SignalAnalyzer::new(config.signal_policy.policy()),
        )
        .with_metrics(metrics)
        .with_notifier(notifier),
    );

    let pipeline = Arc::new(SignalPipeline::new(ctx.clone()));
    let queue = TickerInitQueue::new(ctx);
    let scheduler = DailyScheduler::new(pipeline.clone(), &config.collect_schedule)
        .map_err(|e| e as Box<dyn std::error::Error>)?;

    Ok(Services {
        storage,
        pipeline,
        queue,
        scheduler: Arc::new(scheduler),
    })
}
