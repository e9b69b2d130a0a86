//! In-process storage with the same semantics as the PostgreSQL tables

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use super::{Storage, StorageError};
use crate::models::indicators::Candle;
use crate::models::signal::{SignalAnalysis, TickerSignalRecord};
use crate::models::ticker::{CandleInterval, ManagedTicker};

type CandleKey = (String, &'static str, String);

#[derive(Default)]
struct Tables {
    tickers: BTreeMap<String, ManagedTicker>,
    next_ticker_id: i32,
    /// `(symbol, interval, source)` -> candles by date
    candles: HashMap<CandleKey, BTreeMap<NaiveDate, Candle>>,
    signals: BTreeMap<(String, NaiveDate), TickerSignalRecord>,
    next_signal_id: i32,
}

impl Tables {
    fn latest_signal_date(&self) -> Option<NaiveDate> {
        self.signals.keys().map(|(_, date)| *date).max()
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deactivate a ticker; the HTTP surface has no delete, tests use this
    pub async fn set_active(&self, symbol: &str, active: bool) {
        if let Some(ticker) = self.tables.write().await.tickers.get_mut(symbol) {
            ticker.is_active = active;
        }
    }

    pub async fn candle_count(&self, symbol: &str) -> usize {
        self.tables
            .read()
            .await
            .candles
            .iter()
            .filter(|((s, _, _), _)| s == symbol)
            .map(|(_, rows)| rows.len())
            .sum()
    }

    pub async fn ticker(&self, symbol: &str) -> Option<ManagedTicker> {
        self.tables.read().await.tickers.get(symbol).cloned()
    }
}

fn by_level_then_symbol(a: &TickerSignalRecord, b: &TickerSignalRecord) -> std::cmp::Ordering {
    b.signal_level
        .cmp(&a.signal_level)
        .then_with(|| a.symbol.cmp(&b.symbol))
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn init_schema(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn active_tickers(&self) -> Result<Vec<ManagedTicker>, StorageError> {
        Ok(self
            .tables
            .read()
            .await
            .tickers
            .values()
            .filter(|t| t.is_active)
            .cloned()
            .collect())
    }

    async fn upsert_ticker(&self, ticker: &ManagedTicker) -> Result<ManagedTicker, StorageError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        if let Some(existing) = tables.tickers.get_mut(&ticker.symbol) {
            if ticker.name.is_some() {
                existing.name = ticker.name.clone();
            }
            existing.exchange = ticker.exchange;
            existing.is_active = true;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        tables.next_ticker_id += 1;
        let stored = ManagedTicker {
            id: Some(tables.next_ticker_id),
            is_active: true,
            created_at: now,
            updated_at: now,
            last_collected_at: None,
            ..ticker.clone()
        };
        tables.tickers.insert(stored.symbol.clone(), stored.clone());
        Ok(stored)
    }

    async fn touch_ticker_collected(
        &self,
        symbol: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if let Some(ticker) = self.tables.write().await.tickers.get_mut(symbol) {
            ticker.last_collected_at = Some(at);
            ticker.updated_at = at;
        }
        Ok(())
    }

    async fn save_candles(
        &self,
        symbol: &str,
        interval: CandleInterval,
        candles: &[Candle],
        source: &str,
    ) -> Result<u64, StorageError> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .candles
            .entry((symbol.to_string(), interval.as_str(), source.to_string()))
            .or_default();
        for candle in candles {
            rows.insert(candle.time, candle.clone());
        }
        Ok(candles.len() as u64)
    }

    async fn latest_candles(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, StorageError> {
        let tables = self.tables.read().await;
        let mut merged: BTreeMap<NaiveDate, Candle> = BTreeMap::new();
        for ((s, interval, _), rows) in &tables.candles {
            if s == symbol && *interval == CandleInterval::Daily.as_str() {
                merged.extend(rows.iter().map(|(d, c)| (*d, c.clone())));
            }
        }
        Ok(merged.into_values().rev().take(limit).collect())
    }

    async fn save_signal(
        &self,
        symbol: &str,
        signal_date: NaiveDate,
        analysis: &SignalAnalysis,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let key = (symbol.to_string(), signal_date);
        let mut record = TickerSignalRecord::from_analysis(symbol, signal_date, analysis);

        match tables.signals.get(&key) {
            Some(existing) => {
                record.id = existing.id;
                record.created_at = existing.created_at;
            }
            None => {
                tables.next_signal_id += 1;
                record.id = Some(tables.next_signal_id);
                record.created_at = Some(Utc::now());
            }
        }
        tables.signals.insert(key, record);
        Ok(())
    }

    async fn latest_signal(
        &self,
        symbol: &str,
    ) -> Result<Option<TickerSignalRecord>, StorageError> {
        Ok(self.signal_history(symbol, 1).await?.into_iter().next())
    }

    async fn signal_history(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<TickerSignalRecord>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .signals
            .values()
            .rev()
            .filter(|r| r.symbol == symbol)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn signals_by_level(
        &self,
        min_level: i32,
        signal_date: Option<NaiveDate>,
    ) -> Result<Vec<TickerSignalRecord>, StorageError> {
        let tables = self.tables.read().await;
        let qualifying = tables.signals.values().filter(|r| r.signal_level >= min_level);

        match signal_date {
            Some(date) => {
                let mut rows: Vec<_> = qualifying.filter(|r| r.signal_date == date).cloned().collect();
                rows.sort_by(by_level_then_symbol);
                Ok(rows)
            }
            None => {
                // keys sort by (symbol, date), so the last row seen per symbol is its latest
                let mut latest: BTreeMap<&str, &TickerSignalRecord> = BTreeMap::new();
                for record in qualifying {
                    latest.insert(record.symbol.as_str(), record);
                }
                Ok(latest.into_values().cloned().collect())
            }
        }
    }

    async fn signals_by_date(
        &self,
        signal_date: NaiveDate,
    ) -> Result<Vec<TickerSignalRecord>, StorageError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<_> = tables
            .signals
            .values()
            .filter(|r| r.signal_date == signal_date)
            .cloned()
            .collect();
        rows.sort_by(by_level_then_symbol);
        Ok(rows)
    }

    async fn recommended_signals(&self) -> Result<Vec<TickerSignalRecord>, StorageError> {
        let tables = self.tables.read().await;
        let Some(latest) = tables.latest_signal_date() else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<_> = tables
            .signals
            .values()
            .filter(|r| r.signal_date == latest && r.signal_level >= 4)
            .cloned()
            .collect();
        rows.sort_by_key(|r| (Reverse(r.score), Reverse(r.signal_level), r.symbol.clone()));
        Ok(rows)
    }

    async fn watchlist_signals(&self) -> Result<Vec<TickerSignalRecord>, StorageError> {
        let tables = self.tables.read().await;
        let Some(latest) = tables.latest_signal_date() else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<_> = tables
            .signals
            .values()
            .filter(|r| r.signal_date == latest && r.signal_level == 3 && r.score >= 3)
            .cloned()
            .collect();
        rows.sort_by_key(|r| (Reverse(r.score), r.symbol.clone()));
        Ok(rows)
    }
}
