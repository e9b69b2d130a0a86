//! Daily collect-then-classify pipeline with one in-flight run per kind

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::db::StorageError;
use crate::jobs::context::JobContext;
use crate::jobs::handlers::{analyze_ticker, collect_ticker};
use crate::jobs::types::{
    AnalyzeReport, AnalyzeResult, CollectReport, CollectResult, DailyReport, RunOutcome,
};

/// Holds a run flag for its lifetime
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRun {
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub total_tickers: usize,
    pub total_saved: u64,
    pub errors: usize,
    pub analyzed: usize,
    pub strong_buy_signals: Vec<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    pub is_collecting: bool,
    pub is_analyzing: bool,
    pub is_running_daily: bool,
    pub last_run: Option<LastRun>,
}

pub struct SignalPipeline {
    ctx: Arc<JobContext>,
    collecting: AtomicBool,
    analyzing: AtomicBool,
    running_daily: AtomicBool,
    last_run: RwLock<Option<LastRun>>,
}

impl SignalPipeline {
    pub fn new(ctx: Arc<JobContext>) -> Self {
        Self {
            ctx,
            collecting: AtomicBool::new(false),
            analyzing: AtomicBool::new(false),
            running_daily: AtomicBool::new(false),
            last_run: RwLock::new(None),
        }
    }

    pub fn context(&self) -> &Arc<JobContext> {
        &self.ctx
    }

    pub async fn status(&self) -> PipelineStatus {
        PipelineStatus {
            is_collecting: self.collecting.load(Ordering::Acquire),
            is_analyzing: self.analyzing.load(Ordering::Acquire),
            is_running_daily: self.running_daily.load(Ordering::Acquire),
            last_run: self.last_run.read().await.clone(),
        }
    }

    /// Refresh recent candles for every active ticker
    pub async fn collect_all(&self) -> Result<RunOutcome<CollectReport>, StorageError> {
        let Some(_guard) = RunGuard::acquire(&self.collecting) else {
            warn!("Collection already in progress, skipping");
            self.record_run("collect", "skipped");
            return Ok(RunOutcome::Skipped);
        };

        let report = self.collect_inner().await?;
        self.record_run("collect", "completed");
        Ok(RunOutcome::Completed(report))
    }

    /// Classify every active ticker from stored candles, dated today (UTC)
    pub async fn analyze_all(&self) -> Result<RunOutcome<AnalyzeReport>, StorageError> {
        self.analyze_all_on(Utc::now().date_naive()).await
    }

    pub async fn analyze_all_on(
        &self,
        signal_date: NaiveDate,
    ) -> Result<RunOutcome<AnalyzeReport>, StorageError> {
        let Some(_guard) = RunGuard::acquire(&self.analyzing) else {
            warn!("Analysis already in progress, skipping");
            self.record_run("analyze", "skipped");
            return Ok(RunOutcome::Skipped);
        };

        let report = self.analyze_inner(signal_date).await?;
        self.record_run("analyze", "completed");
        Ok(RunOutcome::Completed(report))
    }

    /// Collect, classify, then notify. Skips if any of the three runs is active.
    pub async fn run_daily(&self) -> Result<RunOutcome<DailyReport>, StorageError> {
        let guards = (
            RunGuard::acquire(&self.running_daily),
            RunGuard::acquire(&self.collecting),
            RunGuard::acquire(&self.analyzing),
        );
        let (Some(_daily), Some(_collect), Some(_analyze)) = guards else {
            warn!("Daily run overlaps an active run, skipping");
            self.record_run("daily", "skipped");
            return Ok(RunOutcome::Skipped);
        };

        let started_at = Utc::now();
        info!("Daily pipeline run started");

        let collect = self.collect_inner().await?;
        let analyze = self.analyze_inner(started_at.date_naive()).await?;
        let report = DailyReport {
            started_at,
            collect,
            analyze,
        };

        *self.last_run.write().await = Some(LastRun {
            finished_at: Utc::now(),
            success: report.success(),
            total_tickers: report.collect.total_tickers,
            total_saved: report.collect.total_saved,
            errors: report.collect.errors + report.analyze.failed,
            analyzed: report.analyze.analyzed,
            strong_buy_signals: report.analyze.strong_buy_signals.clone(),
            duration_ms: report.collect.duration_ms + report.analyze.duration_ms,
        });
        self.record_run("daily", "completed");

        if let Some(notifier) = &self.ctx.notifier {
            if let Err(e) = notifier.notify(&report.summary()).await {
                error!(error = %e, "Failed to send daily summary");
            }
        }

        info!(
            tickers = report.collect.total_tickers,
            saved = report.collect.total_saved,
            analyzed = report.analyze.analyzed,
            strong_buy = report.analyze.strong_buy_signals.len(),
            "Daily pipeline run finished"
        );
        Ok(RunOutcome::Completed(report))
    }

    async fn collect_inner(&self) -> Result<CollectReport, StorageError> {
        let start = Instant::now();
        let tickers = self.ctx.storage.active_tickers().await?;
        info!(tickers = tickers.len(), "Collecting daily candles for {} tickers", tickers.len());

        let mut results = Vec::with_capacity(tickers.len());
        for (i, ticker) in tickers.iter().enumerate() {
            info!(
                symbol = %ticker.symbol,
                "[{}/{}] Collecting {}",
                i + 1,
                tickers.len(),
                ticker.symbol
            );
            match collect_ticker(&self.ctx, &ticker.symbol, ticker.exchange).await {
                Ok(saved) => results.push(CollectResult {
                    symbol: ticker.symbol.clone(),
                    saved,
                    error: None,
                }),
                Err(e) => {
                    error!(symbol = %ticker.symbol, error = %e, "Collection failed for {}", ticker.symbol);
                    self.ctx.record_failure("collect");
                    results.push(CollectResult {
                        symbol: ticker.symbol.clone(),
                        saved: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let report = CollectReport::from_results(results, start.elapsed().as_millis() as u64);
        info!(
            tickers = report.total_tickers,
            saved = report.total_saved,
            errors = report.errors,
            duration_ms = report.duration_ms,
            "Collection finished"
        );
        Ok(report)
    }

    async fn analyze_inner(&self, signal_date: NaiveDate) -> Result<AnalyzeReport, StorageError> {
        let start = Instant::now();
        let tickers = self.ctx.storage.active_tickers().await?;
        info!(
            tickers = tickers.len(),
            date = %signal_date,
            "Classifying {} tickers",
            tickers.len()
        );

        let mut results = Vec::with_capacity(tickers.len());
        for ticker in &tickers {
            let result = match analyze_ticker(&self.ctx, &ticker.symbol, signal_date).await {
                Ok(Some(analysis)) => AnalyzeResult {
                    symbol: ticker.symbol.clone(),
                    signal_level: Some(analysis.signal_level),
                    signal_keyword: Some(analysis.signal_keyword),
                    score: Some(analysis.score),
                    skipped: false,
                    error: None,
                },
                Ok(None) => AnalyzeResult {
                    symbol: ticker.symbol.clone(),
                    signal_level: None,
                    signal_keyword: None,
                    score: None,
                    skipped: true,
                    error: None,
                },
                Err(e) => {
                    error!(symbol = %ticker.symbol, error = %e, "Analysis failed for {}", ticker.symbol);
                    self.ctx.record_failure("analyze");
                    AnalyzeResult {
                        symbol: ticker.symbol.clone(),
                        signal_level: None,
                        signal_keyword: None,
                        score: None,
                        skipped: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }

        let report =
            AnalyzeReport::from_results(signal_date, results, start.elapsed().as_millis() as u64);
        info!(
            analyzed = report.analyzed,
            skipped = report.skipped,
            failed = report.failed,
            strong_buy = report.strong_buy_signals.len(),
            "Classification finished"
        );
        Ok(report)
    }

    fn record_run(&self, kind: &str, outcome: &str) {
        if let Some(metrics) = &self.ctx.metrics {
            metrics
                .pipeline_runs_total
                .with_label_values(&[kind, outcome])
                .inc();
        }
    }
}
