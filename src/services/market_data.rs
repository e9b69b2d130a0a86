//! Candle source interface consumed by the pipeline.

use async_trait::async_trait;

use crate::models::indicators::Candle;
use crate::models::ticker::Exchange;

pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Most recent daily candles, at most `count`
    async fn fetch_daily_candles(
        &self,
        symbol: &str,
        exchange: Exchange,
        count: usize,
    ) -> Result<Vec<Candle>, SourceError>;

    /// Backfill of up to `max_days` daily candles
    async fn fetch_daily_candles_year(
        &self,
        symbol: &str,
        exchange: Exchange,
        max_days: usize,
    ) -> Result<Vec<Candle>, SourceError>;
}
