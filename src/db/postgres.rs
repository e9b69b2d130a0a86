//! PostgreSQL storage for tickers, candles and signals

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tokio::sync::RwLock;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{error, info};

use super::{Storage, StorageError};
use crate::models::indicators::Candle;
use crate::models::signal::{SignalAnalysis, TickerSignalRecord};
use crate::models::ticker::{CandleInterval, Exchange, ManagedTicker};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS managed_tickers (
        id SERIAL PRIMARY KEY,
        symbol VARCHAR(20) NOT NULL UNIQUE,
        name VARCHAR(100),
        exchange VARCHAR(10) NOT NULL DEFAULT 'NAS',
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        last_collected_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS us_stock_candles (
        id BIGSERIAL PRIMARY KEY,
        symbol VARCHAR(20) NOT NULL,
        interval VARCHAR(10) NOT NULL,
        candle_time TIMESTAMPTZ NOT NULL,
        open_price DOUBLE PRECISION NOT NULL,
        high_price DOUBLE PRECISION NOT NULL,
        low_price DOUBLE PRECISION NOT NULL,
        close_price DOUBLE PRECISION NOT NULL,
        volume BIGINT NOT NULL,
        source VARCHAR(20) NOT NULL,
        CONSTRAINT uq_us_stock_candles UNIQUE (symbol, interval, candle_time, source)
    )",
    "CREATE INDEX IF NOT EXISTS idx_us_stock_candles_lookup
        ON us_stock_candles (symbol, interval, candle_time DESC)",
    "CREATE TABLE IF NOT EXISTS ticker_signals (
        id SERIAL PRIMARY KEY,
        symbol VARCHAR(20) NOT NULL,
        signal_date DATE NOT NULL,
        signal_level INTEGER NOT NULL,
        signal_keyword VARCHAR(50) NOT NULL,
        signal_message TEXT,
        trend VARCHAR(10) NOT NULL,
        trend_status VARCHAR(10) NOT NULL,
        rsi DOUBLE PRECISION NOT NULL,
        rsi_status VARCHAR(20) NOT NULL,
        pullback_rate DOUBLE PRECISION NOT NULL,
        pullback_status VARCHAR(10) NOT NULL,
        volume_ratio DOUBLE PRECISION NOT NULL,
        volume_status VARCHAR(10) NOT NULL,
        days_since_high INTEGER NOT NULL DEFAULT 0,
        duration_status VARCHAR(10) NOT NULL DEFAULT 'fail',
        consolidation_rate DOUBLE PRECISION NOT NULL,
        consolidation_status VARCHAR(10) NOT NULL,
        score INTEGER NOT NULL,
        current_price DOUBLE PRECISION NOT NULL,
        ma20 DOUBLE PRECISION,
        ma60 DOUBLE PRECISION,
        high_2w DOUBLE PRECISION NOT NULL,
        high_52w DOUBLE PRECISION NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT uq_ticker_signals UNIQUE (symbol, signal_date)
    )",
    "CREATE INDEX IF NOT EXISTS idx_ticker_signals_symbol ON ticker_signals (symbol)",
    "CREATE INDEX IF NOT EXISTS idx_ticker_signals_date ON ticker_signals (signal_date DESC)",
    "CREATE INDEX IF NOT EXISTS idx_ticker_signals_level ON ticker_signals (signal_level)",
];

const TICKER_COLUMNS: &str =
    "id, symbol, name, exchange, is_active, created_at, updated_at, last_collected_at";

const SIGNAL_COLUMNS: &str = "id, symbol, signal_date, signal_level, signal_keyword, \
     COALESCE(signal_message, '') AS signal_message, trend, trend_status, rsi, rsi_status, \
     pullback_rate, pullback_status, volume_ratio, volume_status, days_since_high, \
     duration_status, consolidation_rate, consolidation_status, score, current_price, \
     ma20, ma60, high_2w, high_52w, created_at";

pub struct PostgresDatabase {
    client: Arc<RwLock<Option<Client>>>,
}

impl PostgresDatabase {
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        info!("Connected to PostgreSQL");
        Ok(Self {
            client: Arc::new(RwLock::new(Some(client))),
        })
    }

    pub async fn is_connected(&self) -> bool {
        match self.client.read().await.as_ref() {
            Some(c) => !c.is_closed(),
            None => false,
        }
    }

    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<Row>, StorageError> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or(StorageError::Unavailable)?;
        Ok(c.query(sql, params).await?)
    }

    async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<u64, StorageError> {
        let client = self.client.read().await;
        let c = client.as_ref().ok_or(StorageError::Unavailable)?;
        Ok(c.execute(sql, params).await?)
    }

    async fn query_signals(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<TickerSignalRecord>, StorageError> {
        self.query(sql, params)
            .await?
            .iter()
            .map(signal_from_row)
            .collect()
    }
}

fn ticker_from_row(row: &Row) -> Result<ManagedTicker, StorageError> {
    let exchange: String = row.try_get("exchange")?;
    Ok(ManagedTicker {
        id: row.try_get("id")?,
        symbol: row.try_get("symbol")?,
        name: row.try_get("name")?,
        exchange: Exchange::from_str(&exchange).map_err(StorageError::Invalid)?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        last_collected_at: row.try_get("last_collected_at")?,
    })
}

fn signal_from_row(row: &Row) -> Result<TickerSignalRecord, StorageError> {
    Ok(TickerSignalRecord {
        id: row.try_get("id")?,
        symbol: row.try_get("symbol")?,
        signal_date: row.try_get("signal_date")?,
        signal_level: row.try_get("signal_level")?,
        signal_keyword: row.try_get("signal_keyword")?,
        signal_message: row.try_get("signal_message")?,
        trend: row.try_get("trend")?,
        trend_status: row.try_get("trend_status")?,
        rsi: row.try_get("rsi")?,
        rsi_status: row.try_get("rsi_status")?,
        pullback_rate: row.try_get("pullback_rate")?,
        pullback_status: row.try_get("pullback_status")?,
        volume_ratio: row.try_get("volume_ratio")?,
        volume_status: row.try_get("volume_status")?,
        days_since_high: row.try_get("days_since_high")?,
        duration_status: row.try_get("duration_status")?,
        consolidation_rate: row.try_get("consolidation_rate")?,
        consolidation_status: row.try_get("consolidation_status")?,
        score: row.try_get("score")?,
        current_price: row.try_get("current_price")?,
        ma20: row.try_get("ma20")?,
        ma60: row.try_get("ma60")?,
        high_2w: row.try_get("high_2w")?,
        high_52w: row.try_get("high_52w")?,
        created_at: row.try_get("created_at")?,
    })
}

fn candle_time(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[async_trait]
impl Storage for PostgresDatabase {
    async fn init_schema(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            self.execute(statement, &[]).await?;
        }
        info!("Database schema ready");
        Ok(())
    }

    async fn active_tickers(&self) -> Result<Vec<ManagedTicker>, StorageError> {
        let sql = format!(
            "SELECT {} FROM managed_tickers WHERE is_active = TRUE ORDER BY symbol ASC",
            TICKER_COLUMNS
        );
        self.query(&sql, &[]).await?.iter().map(ticker_from_row).collect()
    }

    async fn upsert_ticker(&self, ticker: &ManagedTicker) -> Result<ManagedTicker, StorageError> {
        let sql = format!(
            "INSERT INTO managed_tickers (symbol, name, exchange)
             VALUES ($1, $2, $3)
             ON CONFLICT (symbol) DO UPDATE SET
                name = COALESCE(EXCLUDED.name, managed_tickers.name),
                exchange = EXCLUDED.exchange,
                is_active = TRUE,
                updated_at = NOW()
             RETURNING {}",
            TICKER_COLUMNS
        );
        let rows = self
            .query(&sql, &[&ticker.symbol, &ticker.name, &ticker.exchange.code()])
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| StorageError::Invalid("upsert returned no row".to_string()))?;
        ticker_from_row(row)
    }

    async fn touch_ticker_collected(
        &self,
        symbol: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.execute(
            "UPDATE managed_tickers SET last_collected_at = $2, updated_at = $2 WHERE symbol = $1",
            &[&symbol, &at],
        )
        .await?;
        Ok(())
    }

    async fn save_candles(
        &self,
        symbol: &str,
        interval: CandleInterval,
        candles: &[Candle],
        source: &str,
    ) -> Result<u64, StorageError> {
        if candles.is_empty() {
            return Ok(0);
        }

        let client = self.client.read().await;
        let c = client.as_ref().ok_or(StorageError::Unavailable)?;
        let statement = c
            .prepare(
                "INSERT INTO us_stock_candles
                    (symbol, interval, candle_time, open_price, high_price, low_price, close_price, volume, source)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT ON CONSTRAINT uq_us_stock_candles DO UPDATE SET
                    open_price = EXCLUDED.open_price,
                    high_price = EXCLUDED.high_price,
                    low_price = EXCLUDED.low_price,
                    close_price = EXCLUDED.close_price,
                    volume = EXCLUDED.volume",
            )
            .await?;

        let interval = interval.as_str();
        let mut saved = 0;
        for candle in candles {
            let time = candle_time(candle.time);
            let volume = i64::try_from(candle.volume).unwrap_or(i64::MAX);
            saved += c
                .execute(
                    &statement,
                    &[
                        &symbol,
                        &interval,
                        &time,
                        &candle.open,
                        &candle.high,
                        &candle.low,
                        &candle.close,
                        &volume,
                        &source,
                    ],
                )
                .await?;
        }

        info!(symbol = %symbol, interval = interval, saved = saved, source = source, "Candles saved");
        Ok(saved)
    }

    async fn latest_candles(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self
            .query(
                "SELECT candle_time, open_price, high_price, low_price, close_price, volume
                 FROM us_stock_candles
                 WHERE symbol = $1 AND interval = $2
                 ORDER BY candle_time DESC
                 LIMIT $3",
                &[&symbol, &CandleInterval::Daily.as_str(), &limit],
            )
            .await?;

        rows.iter()
            .map(|row| {
                let time: DateTime<Utc> = row.try_get(0)?;
                let volume: i64 = row.try_get(5)?;
                Ok(Candle::new(
                    row.try_get(1)?,
                    row.try_get(2)?,
                    row.try_get(3)?,
                    row.try_get(4)?,
                    u64::try_from(volume).unwrap_or(0),
                    time.date_naive(),
                ))
            })
            .collect()
    }

    async fn save_signal(
        &self,
        symbol: &str,
        signal_date: NaiveDate,
        analysis: &SignalAnalysis,
    ) -> Result<(), StorageError> {
        let r = TickerSignalRecord::from_analysis(symbol, signal_date, analysis);
        self.execute(
            "INSERT INTO ticker_signals (
                symbol, signal_date, signal_level, signal_keyword, signal_message,
                trend, trend_status, rsi, rsi_status,
                pullback_rate, pullback_status, volume_ratio, volume_status,
                days_since_high, duration_status, consolidation_rate, consolidation_status,
                score, current_price, ma20, ma60, high_2w, high_52w
             ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
             )
             ON CONFLICT ON CONSTRAINT uq_ticker_signals DO UPDATE SET
                signal_level = EXCLUDED.signal_level,
                signal_keyword = EXCLUDED.signal_keyword,
                signal_message = EXCLUDED.signal_message,
                trend = EXCLUDED.trend,
                trend_status = EXCLUDED.trend_status,
                rsi = EXCLUDED.rsi,
                rsi_status = EXCLUDED.rsi_status,
                pullback_rate = EXCLUDED.pullback_rate,
                pullback_status = EXCLUDED.pullback_status,
                volume_ratio = EXCLUDED.volume_ratio,
                volume_status = EXCLUDED.volume_status,
                days_since_high = EXCLUDED.days_since_high,
                duration_status = EXCLUDED.duration_status,
                consolidation_rate = EXCLUDED.consolidation_rate,
                consolidation_status = EXCLUDED.consolidation_status,
                score = EXCLUDED.score,
                current_price = EXCLUDED.current_price,
                ma20 = EXCLUDED.ma20,
                ma60 = EXCLUDED.ma60,
                high_2w = EXCLUDED.high_2w,
                high_52w = EXCLUDED.high_52w",
            &[
                &r.symbol,
                &r.signal_date,
                &r.signal_level,
                &r.signal_keyword,
                &r.signal_message,
                &r.trend,
                &r.trend_status,
                &r.rsi,
                &r.rsi_status,
                &r.pullback_rate,
                &r.pullback_status,
                &r.volume_ratio,
                &r.volume_status,
                &r.days_since_high,
                &r.duration_status,
                &r.consolidation_rate,
                &r.consolidation_status,
                &r.score,
                &r.current_price,
                &r.ma20,
                &r.ma60,
                &r.high_2w,
                &r.high_52w,
            ],
        )
        .await?;
        Ok(())
    }

    async fn latest_signal(
        &self,
        symbol: &str,
    ) -> Result<Option<TickerSignalRecord>, StorageError> {
        let sql = format!(
            "SELECT {} FROM ticker_signals WHERE symbol = $1 ORDER BY signal_date DESC LIMIT 1",
            SIGNAL_COLUMNS
        );
        Ok(self.query_signals(&sql, &[&symbol]).await?.into_iter().next())
    }

    async fn signal_history(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<TickerSignalRecord>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = format!(
            "SELECT {} FROM ticker_signals WHERE symbol = $1 ORDER BY signal_date DESC LIMIT $2",
            SIGNAL_COLUMNS
        );
        self.query_signals(&sql, &[&symbol, &limit]).await
    }

    async fn signals_by_level(
        &self,
        min_level: i32,
        signal_date: Option<NaiveDate>,
    ) -> Result<Vec<TickerSignalRecord>, StorageError> {
        match signal_date {
            Some(date) => {
                let sql = format!(
                    "SELECT {} FROM ticker_signals
                     WHERE signal_level >= $1 AND signal_date = $2
                     ORDER BY signal_level DESC, symbol",
                    SIGNAL_COLUMNS
                );
                self.query_signals(&sql, &[&min_level, &date]).await
            }
            None => {
                let sql = format!(
                    "SELECT DISTINCT ON (symbol) {} FROM ticker_signals
                     WHERE signal_level >= $1
                     ORDER BY symbol, signal_date DESC",
                    SIGNAL_COLUMNS
                );
                self.query_signals(&sql, &[&min_level]).await
            }
        }
    }

    async fn signals_by_date(
        &self,
        signal_date: NaiveDate,
    ) -> Result<Vec<TickerSignalRecord>, StorageError> {
        let sql = format!(
            "SELECT {} FROM ticker_signals WHERE signal_date = $1 ORDER BY signal_level DESC, symbol",
            SIGNAL_COLUMNS
        );
        self.query_signals(&sql, &[&signal_date]).await
    }

    async fn recommended_signals(&self) -> Result<Vec<TickerSignalRecord>, StorageError> {
        let sql = format!(
            "SELECT {} FROM ticker_signals
             WHERE signal_date = (SELECT MAX(signal_date) FROM ticker_signals)
               AND signal_level >= 4
             ORDER BY score DESC, signal_level DESC, symbol ASC",
            SIGNAL_COLUMNS
        );
        self.query_signals(&sql, &[]).await
    }

    async fn watchlist_signals(&self) -> Result<Vec<TickerSignalRecord>, StorageError> {
        let sql = format!(
            "SELECT {} FROM ticker_signals
             WHERE signal_date = (SELECT MAX(signal_date) FROM ticker_signals)
               AND signal_level = 3
               AND score >= 3
             ORDER BY score DESC, symbol ASC",
            SIGNAL_COLUMNS
        );
        self.query_signals(&sql, &[]).await
    }
}
