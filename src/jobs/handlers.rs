//! Per-ticker steps shared by the pipeline and the init queue

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::db::KIS_SOURCE;
use crate::jobs::context::JobContext;
use crate::models::signal::SignalAnalysis;
use crate::models::ticker::{CandleInterval, Exchange};
use crate::services::market_data::SourceError;
use crate::signals::engine::MAX_WINDOW;

/// Recent candles refreshed by the daily collection
pub const DAILY_COLLECT_COUNT: usize = 30;
/// History backfilled for a newly added ticker
pub const INIT_HISTORY_DAYS: usize = 365;

/// Fetch the latest daily candles and upsert them
pub async fn collect_ticker(
    ctx: &JobContext,
    symbol: &str,
    exchange: Exchange,
) -> Result<u64, SourceError> {
    let candles = ctx
        .candle_source
        .fetch_daily_candles(symbol, exchange, DAILY_COLLECT_COUNT)
        .await?;

    let saved = ctx
        .storage
        .save_candles(symbol, CandleInterval::Daily, &candles, KIS_SOURCE)
        .await?;
    ctx.storage.touch_ticker_collected(symbol, Utc::now()).await?;

    if let Some(metrics) = &ctx.metrics {
        metrics.candles_saved_total.inc_by(saved);
    }
    debug!(symbol = %symbol, saved = saved, "Collected daily candles for {}", symbol);
    Ok(saved)
}

/// Backfill a year of candles; an empty reply is an error
pub async fn init_ticker(
    ctx: &JobContext,
    symbol: &str,
    exchange: Exchange,
) -> Result<u64, SourceError> {
    let candles = ctx
        .candle_source
        .fetch_daily_candles_year(symbol, exchange, INIT_HISTORY_DAYS)
        .await?;

    if candles.is_empty() {
        return Err(format!("{}: no candle data returned", symbol).into());
    }

    let saved = ctx
        .storage
        .save_candles(symbol, CandleInterval::Daily, &candles, KIS_SOURCE)
        .await?;
    ctx.storage.touch_ticker_collected(symbol, Utc::now()).await?;

    if let Some(metrics) = &ctx.metrics {
        metrics.candles_saved_total.inc_by(saved);
    }
    info!(symbol = %symbol, saved = saved, "Backfilled {} candles for {}", saved, symbol);
    Ok(saved)
}

/// Classify a ticker from stored candles and persist the result under `signal_date`.
///
/// `Ok(None)` means the history was too short to classify.
pub async fn analyze_ticker(
    ctx: &JobContext,
    symbol: &str,
    signal_date: NaiveDate,
) -> Result<Option<SignalAnalysis>, SourceError> {
    let candles = ctx.storage.latest_candles(symbol, MAX_WINDOW).await?;

    let Some(analysis) = ctx.analyzer.analyze(&candles) else {
        debug!(
            symbol = %symbol,
            candles = candles.len(),
            "Skipping {}: not enough candle history",
            symbol
        );
        if let Some(metrics) = &ctx.metrics {
            metrics.signals_skipped_total.inc();
        }
        return Ok(None);
    };

    ctx.storage.save_signal(symbol, signal_date, &analysis).await?;

    if let Some(metrics) = &ctx.metrics {
        let level = analysis.signal_level.to_string();
        metrics
            .signal_evaluations_total
            .with_label_values(&[level.as_str()])
            .inc();
    }
    debug!(
        symbol = %symbol,
        level = analysis.signal_level,
        score = analysis.score,
        keyword = %analysis.signal_keyword,
        "Classified {}",
        symbol
    );
    Ok(Some(analysis))
}
