//! Persistence for tickers, candles and signals.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::models::indicators::Candle;
use crate::models::signal::{SignalAnalysis, TickerSignalRecord};
use crate::models::ticker::{CandleInterval, ManagedTicker};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PostgresDatabase;

/// Source tag written with every candle fetched from KIS
pub const KIS_SOURCE: &str = "kis";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("database connection is not available")]
    Unavailable,

    #[error("invalid stored value: {0}")]
    Invalid(String),
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Create tables and indexes if they do not exist
    async fn init_schema(&self) -> Result<(), StorageError>;

    /// Active tickers ordered by symbol
    async fn active_tickers(&self) -> Result<Vec<ManagedTicker>, StorageError>;

    /// Insert or reactivate a ticker; a missing name keeps the stored one
    async fn upsert_ticker(&self, ticker: &ManagedTicker) -> Result<ManagedTicker, StorageError>;

    async fn touch_ticker_collected(
        &self,
        symbol: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Idempotent upsert keyed on `(symbol, interval, candle_time, source)`; returns rows written
    async fn save_candles(
        &self,
        symbol: &str,
        interval: CandleInterval,
        candles: &[Candle],
        source: &str,
    ) -> Result<u64, StorageError>;

    /// Most recent daily candles first
    async fn latest_candles(&self, symbol: &str, limit: usize)
        -> Result<Vec<Candle>, StorageError>;

    /// Upsert keyed on `(symbol, signal_date)`; the last write wins
    async fn save_signal(
        &self,
        symbol: &str,
        signal_date: NaiveDate,
        analysis: &SignalAnalysis,
    ) -> Result<(), StorageError>;

    async fn latest_signal(&self, symbol: &str) -> Result<Option<TickerSignalRecord>, StorageError>;

    async fn signal_history(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<TickerSignalRecord>, StorageError>;

    /// With a date: that day's rows at or above `min_level`. Without: each
    /// symbol's latest qualifying row.
    async fn signals_by_level(
        &self,
        min_level: i32,
        signal_date: Option<NaiveDate>,
    ) -> Result<Vec<TickerSignalRecord>, StorageError>;

    async fn signals_by_date(
        &self,
        signal_date: NaiveDate,
    ) -> Result<Vec<TickerSignalRecord>, StorageError>;

    /// Latest date, level 4 and up, best score first
    async fn recommended_signals(&self) -> Result<Vec<TickerSignalRecord>, StorageError>;

    /// Latest date, level 3 with a score of at least 3
    async fn watchlist_signals(&self) -> Result<Vec<TickerSignalRecord>, StorageError>;
}
