//! KIS overseas-price REST client

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use super::error::KisError;
use super::parser::{self, DataIssue};
use super::rate_limiter::RateLimiter;
use super::token::TokenManager;
use super::types::{DailyPriceResponse, PriceResponse, Quote, RawDailyCandle};
use crate::config::KisConfig;
use crate::metrics::Metrics;
use crate::models::indicators::Candle;
use crate::models::ticker::Exchange;
use crate::services::market_data::{CandleSource, SourceError};

const DAILY_PRICE_PATH: &str = "/uapi/overseas-price/v1/quotations/dailyprice";
const DAILY_PRICE_TR_ID: &str = "HHDFS76240000";
const PRICE_PATH: &str = "/uapi/overseas-price/v1/quotations/price";
const PRICE_TR_ID: &str = "HHDFS00000300";

/// Upper bound on pages fetched by a year backfill
pub const MAX_YEAR_PAGES: usize = 10;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct KisClient {
    http: reqwest::Client,
    base_url: String,
    app_key: String,
    app_secret: String,
    tokens: Arc<TokenManager>,
    limiter: Arc<RateLimiter>,
    backoff: ExponentialBuilder,
    metrics: Option<Arc<Metrics>>,
}

impl KisClient {
    pub fn new(config: &KisConfig) -> Result<Self, KisError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let tokens = Arc::new(TokenManager::new(
            http.clone(),
            config.base_url.clone(),
            config.app_key.clone(),
            config.app_secret.clone(),
            config.token_path.clone(),
        ));

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_key: config.app_key.clone(),
            app_secret: config.app_secret.clone(),
            tokens,
            limiter: Arc::new(RateLimiter::new(config.rate_limit)),
            backoff: ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(500))
                .with_max_times(3),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Most recent daily candles, newest first, at most `count`
    pub async fn daily_candles(
        &self,
        symbol: &str,
        exchange: Exchange,
        count: usize,
    ) -> Result<Vec<Candle>, KisError> {
        info!(symbol = %symbol, exchange = %exchange, "Fetching daily candles");

        let rows = self.daily_page(symbol, exchange, "").await?;
        let mut candles = self.parse_rows(symbol, &rows);
        candles.truncate(count);
        Ok(candles)
    }

    /// Up to `max_days` daily candles, paging backwards with the last returned date
    pub async fn daily_candles_year(
        &self,
        symbol: &str,
        exchange: Exchange,
        max_days: usize,
    ) -> Result<Vec<Candle>, KisError> {
        info!(symbol = %symbol, max_days = max_days, "Fetching a year of daily candles");

        let mut rows: Vec<RawDailyCandle> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut cursor = String::new();

        for page in 0..MAX_YEAR_PAGES {
            let batch = self.daily_page(symbol, exchange, &cursor).await?;
            if batch.is_empty() {
                break;
            }

            let next_cursor = batch.last().and_then(|r| r.xymd.clone()).unwrap_or_default();
            let fetched = batch.len();
            for row in batch {
                let key = row.xymd.clone().unwrap_or_default();
                if key.is_empty() || seen.insert(key) {
                    rows.push(row);
                }
            }

            debug!(
                symbol = %symbol,
                page = page + 1,
                fetched = fetched,
                total = rows.len(),
                "Fetched daily candle page"
            );

            if rows.len() >= max_days {
                rows.truncate(max_days);
                break;
            }
            if next_cursor.is_empty() || next_cursor == cursor {
                break;
            }
            cursor = next_cursor;
        }

        let candles = self.parse_rows(symbol, &rows);
        info!(symbol = %symbol, candles = candles.len(), "Year of daily candles fetched");
        Ok(candles)
    }

    /// Latest quote; `None` when KIS has no price for the symbol on that exchange
    pub async fn price(&self, symbol: &str, exchange: Exchange) -> Result<Option<Quote>, KisError> {
        let symbol = symbol.to_uppercase();
        let params = [
            ("AUTH", ""),
            ("EXCD", exchange.code()),
            ("SYMB", symbol.as_str()),
        ];

        let response: Option<PriceResponse> =
            self.request(PRICE_PATH, PRICE_TR_ID, &params).await?;
        Ok(response
            .and_then(|r| r.output)
            .and_then(|raw| parser::parse_quote(&raw)))
    }

    async fn daily_page(
        &self,
        symbol: &str,
        exchange: Exchange,
        bymd: &str,
    ) -> Result<Vec<RawDailyCandle>, KisError> {
        let symbol = symbol.to_uppercase();
        let params = [
            ("AUTH", ""),
            ("EXCD", exchange.code()),
            ("SYMB", symbol.as_str()),
            ("GUBN", "0"),
            ("BYMD", bymd),
            ("MODP", "1"),
        ];

        let response: Option<DailyPriceResponse> =
            self.request(DAILY_PRICE_PATH, DAILY_PRICE_TR_ID, &params).await?;

        Ok(match response {
            Some(r) => {
                if !r.is_success() {
                    warn!(
                        symbol = %symbol,
                        msg_cd = %r.msg_cd,
                        msg = %r.msg1,
                        "KIS reported an unsuccessful daily price lookup"
                    );
                }
                r.output2.unwrap_or_default()
            }
            None => Vec::new(),
        })
    }

    fn parse_rows(&self, symbol: &str, rows: &[RawDailyCandle]) -> Vec<Candle> {
        let parsed = parser::parse_daily_candles(rows);
        self.report_issues(symbol, &parsed.issues);
        parsed.candles
    }

    fn report_issues(&self, symbol: &str, issues: &[DataIssue]) {
        for issue in issues {
            warn!(
                symbol = %symbol,
                date = ?issue.date,
                field = issue.field,
                raw = ?issue.raw,
                kind = ?issue.kind,
                "Malformed candle field"
            );
            if let Some(metrics) = &self.metrics {
                metrics
                    .data_quality_issues_total
                    .with_label_values(&[issue.field])
                    .inc();
            }
        }
    }

    /// GET with rate limiting and retries. Non-2xx replies log and yield `None`.
    async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        tr_id: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<T>, KisError> {
        let result = (move || async move { self.send_once::<T>(path, tr_id, params).await })
            .retry(self.backoff)
            .when(KisError::is_transient)
            .notify(|err, delay| {
                warn!(
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    path = path,
                    "Retrying KIS request"
                );
            })
            .await;

        match result {
            Ok(body) => Ok(Some(body)),
            Err(KisError::Status { status, body }) => {
                error!(status = status, body = %body, path = path, "KIS request failed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        path: &str,
        tr_id: &str,
        params: &[(&str, &str)],
    ) -> Result<T, KisError> {
        self.limiter.wait().await;
        let token = self.tokens.get_token().await?;

        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(params)
            .bearer_auth(token)
            .header("appkey", &self.app_key)
            .header("appsecret", &self.app_secret)
            .header("tr_id", tr_id)
            .header("custtype", "P")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CandleSource for KisClient {
    async fn fetch_daily_candles(
        &self,
        symbol: &str,
        exchange: Exchange,
        count: usize,
    ) -> Result<Vec<Candle>, SourceError> {
        Ok(self.daily_candles(symbol, exchange, count).await?)
    }

    async fn fetch_daily_candles_year(
        &self,
        symbol: &str,
        exchange: Exchange,
        max_days: usize,
    ) -> Result<Vec<Candle>, SourceError> {
        Ok(self.daily_candles_year(symbol, exchange, max_days).await?)
    }
}
