//! Cron-based scheduler that drives the daily pipeline run

use chrono::{DateTime, Utc};
use cron::Schedule;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::db::StorageError;
use crate::jobs::pipeline::{PipelineStatus, SignalPipeline};
use crate::jobs::types::{DailyReport, RunOutcome};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub schedule: String,
    pub next_run: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub pipeline: PipelineStatus,
}

/// Runs `SignalPipeline::run_daily` on every tick of a cron schedule (UTC)
pub struct DailyScheduler {
    pipeline: Arc<SignalPipeline>,
    expression: String,
    schedule: Schedule,
    handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl DailyScheduler {
    /// Create a scheduler from a six-field cron expression
    /// (`sec min hour day month weekday`)
    pub fn new(
        pipeline: Arc<SignalPipeline>,
        expression: &str,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let schedule = Schedule::from_str(expression)
            .map_err(|e| format!("Invalid cron expression '{}': {}", expression, e))?;

        info!(cron = %expression, "DailyScheduler: created with cron {}", expression);

        Ok(Self {
            pipeline,
            expression: expression.to_string(),
            schedule,
            handle: Arc::new(RwLock::new(None)),
        })
    }

    pub fn pipeline(&self) -> &Arc<SignalPipeline> {
        &self.pipeline
    }

    /// Start the tick loop; calling it while running is a no-op
    pub async fn start(&self) {
        let mut slot = self.handle.write().await;
        if slot.is_some() {
            info!("DailyScheduler: already running");
            return;
        }

        let pipeline = self.pipeline.clone();
        let schedule = self.schedule.clone();

        let handle = tokio::spawn(async move {
            info!("DailyScheduler: started, waiting for cron schedule...");

            loop {
                let Some(next_tick) = schedule.upcoming(Utc).next() else {
                    error!("DailyScheduler: schedule has no upcoming runs, stopping");
                    break;
                };

                let now = Utc::now();
                if next_tick > now {
                    let duration = (next_tick - now).to_std().unwrap_or_default();
                    tokio::time::sleep(duration).await;
                }

                info!(tick = %next_tick, "DailyScheduler: cron tick, starting daily run");
                match pipeline.run_daily().await {
                    Ok(RunOutcome::Completed(report)) => info!(
                        success = report.success(),
                        strong_buy = report.analyze.strong_buy_signals.len(),
                        "DailyScheduler: daily run finished"
                    ),
                    Ok(RunOutcome::Skipped) => {
                        info!("DailyScheduler: previous run still active, tick skipped")
                    }
                    Err(e) => error!(error = %e, "DailyScheduler: daily run failed"),
                }
            }
        });

        *slot = Some(handle);
        info!("DailyScheduler: started successfully");
    }

    pub async fn stop(&self) {
        let mut handle = self.handle.write().await;
        if let Some(h) = handle.take() {
            h.abort();
            info!("DailyScheduler: stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle.read().await.is_some()
    }

    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.schedule.upcoming(Utc).next()
    }

    pub async fn status(&self) -> SchedulerStatus {
        let is_running = self.is_running().await;
        SchedulerStatus {
            is_running,
            schedule: self.expression.clone(),
            next_run: if is_running { self.next_run() } else { None },
            pipeline: self.pipeline.status().await,
        }
    }

    /// Run the daily pipeline immediately, outside the schedule
    pub async fn run_now(&self) -> Result<RunOutcome<DailyReport>, StorageError> {
        info!("DailyScheduler: manual run requested");
        self.pipeline.run_daily().await
    }
}
