//! HTTP API over the pipeline, init queue and stored signals (Axum)

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, Level};

use crate::core::scheduler::DailyScheduler;
use crate::db::{Storage, StorageError};
use crate::jobs::pipeline::SignalPipeline;
use crate::jobs::ticker_queue::TickerInitQueue;
use crate::jobs::types::RunOutcome;
use crate::metrics::Metrics;
use crate::models::ticker::{normalize_symbol, Exchange, ManagedTicker};
use crate::signals::engine::{SignalAnalyzer, MAX_WINDOW};
use crate::signals::policy::PolicyPreset;

const DEFAULT_HISTORY_LIMIT: usize = 30;

#[derive(Clone)]
pub struct AppState {
    pub health: Arc<RwLock<HealthStatus>>,
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
    pub storage: Option<Arc<dyn Storage>>,
    pub pipeline: Option<Arc<SignalPipeline>>,
    pub queue: Option<Arc<TickerInitQueue>>,
    pub scheduler: Option<Arc<DailyScheduler>>,
    /// Preset used by live analysis when the request names none
    pub policy: PolicyPreset,
}

impl AppState {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            health: Arc::new(RwLock::new(HealthStatus::default())),
            metrics,
            start_time: Arc::new(Instant::now()),
            storage: None,
            pipeline: None,
            queue: None,
            scheduler: None,
            policy: PolicyPreset::default(),
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_pipeline(mut self, pipeline: Arc<SignalPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn with_queue(mut self, queue: Arc<TickerInitQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<DailyScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn with_policy(mut self, policy: PolicyPreset) -> Self {
        self.policy = policy;
        self
    }

    fn storage(&self) -> Result<&Arc<dyn Storage>, StatusCode> {
        self.storage.as_ref().ok_or(StatusCode::SERVICE_UNAVAILABLE)
    }

    fn pipeline(&self) -> Result<&Arc<SignalPipeline>, StatusCode> {
        self.pipeline.as_ref().ok_or(StatusCode::SERVICE_UNAVAILABLE)
    }

    fn queue(&self) -> Result<&Arc<TickerInitQueue>, StatusCode> {
        self.queue.as_ref().ok_or(StatusCode::SERVICE_UNAVAILABLE)
    }

    fn scheduler(&self) -> Result<&Arc<DailyScheduler>, StatusCode> {
        self.scheduler.as_ref().ok_or(StatusCode::SERVICE_UNAVAILABLE)
    }
}

#[derive(Clone, Debug)]
pub struct HealthStatus {
    pub status: String,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

fn storage_failure(action: &'static str) -> impl Fn(StorageError) -> StatusCode {
    move |e| {
        error!(error = %e, "Failed to {}", action);
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "error": message.into() })),
    )
        .into_response()
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let health = state.health.read().await;
    let uptime_seconds = state.start_time.elapsed().as_secs();
    Ok(Json(json!({
        "status": health.status,
        "uptime_seconds": uptime_seconds,
        "service": "stockpulse"
    })))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .export()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.metrics.http_requests_in_flight.inc();
    let response = next.run(request).await;
    state.metrics.http_requests_in_flight.dec();

    let status = response.status();
    let duration = start.elapsed();
    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(duration.as_secs_f64());

    if status.is_server_error() {
        error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = duration.as_millis(),
            "HTTP request error"
        );
    }

    response
}

#[derive(Debug, Deserialize)]
struct TickerRequest {
    symbol: Option<String>,
    exchange: Option<String>,
    name: Option<String>,
}

impl TickerRequest {
    /// Normalised symbol and exchange, or the 400 body to send back
    fn validate(&self) -> Result<(String, Exchange), Response> {
        let symbol = self
            .symbol
            .as_deref()
            .map(normalize_symbol)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| bad_request("Symbol is required"))?;

        let exchange = match self.exchange.as_deref() {
            None => Exchange::default(),
            Some(code) if code.trim().is_empty() => Exchange::default(),
            Some(code) => code.parse().map_err(bad_request)?,
        };
        Ok((symbol, exchange))
    }
}

async fn list_tickers(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let tickers = state
        .storage()?
        .active_tickers()
        .await
        .map_err(storage_failure("load tickers"))?;
    Ok(Json(json!({ "tickers": tickers })))
}

/// Register a ticker, or reactivate it if it already exists
async fn add_ticker(
    State(state): State<AppState>,
    Json(request): Json<TickerRequest>,
) -> Result<Response, StatusCode> {
    let (symbol, exchange) = match request.validate() {
        Ok(valid) => valid,
        Err(response) => return Ok(response),
    };

    let ticker = ManagedTicker::new(&symbol, request.name.clone(), exchange);
    let saved = state
        .storage()?
        .upsert_ticker(&ticker)
        .await
        .map_err(storage_failure("register ticker"))?;

    info!(symbol = %saved.symbol, exchange = %saved.exchange, "Registered ticker {}", saved.symbol);
    Ok(Json(json!({
        "success": true,
        "message": format!("Ticker {} registered", saved.symbol),
        "ticker": saved,
    }))
    .into_response())
}

async fn queue_status(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let status = state.queue()?.status().await;
    Ok(Json(json!({
        "success": true,
        "queueLength": status.queue_length,
        "isProcessing": status.is_processing,
        "currentSymbol": status.current_symbol,
        "processed": status.processed,
        "failed": status.failed,
    })))
}

#[derive(Debug, Deserialize)]
struct QueueAction {
    action: Option<String>,
}

async fn queue_action(
    State(state): State<AppState>,
    Json(request): Json<QueueAction>,
) -> Result<Response, StatusCode> {
    let queue = state.queue()?;
    let message = match request.action.as_deref() {
        Some("clear") => {
            queue.clear().await;
            "Queue cleared"
        }
        Some("resetStats") => {
            queue.reset_stats().await;
            "Queue stats reset"
        }
        _ => return Ok(bad_request("Invalid action")),
    };
    Ok(Json(json!({ "success": true, "message": message })).into_response())
}

/// Queue a ticker for a year-long backfill
async fn queue_add(
    State(state): State<AppState>,
    Json(request): Json<TickerRequest>,
) -> Result<Response, StatusCode> {
    let (symbol, exchange) = match request.validate() {
        Ok(valid) => valid,
        Err(response) => return Ok(response),
    };

    let queue = state.queue()?;
    let added = queue.add(&symbol, exchange).await;
    let status = queue.status().await;

    let message = if added {
        format!("{} queued", symbol)
    } else {
        format!("{} is already queued", symbol)
    };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "queueLength": status.queue_length,
        "isProcessing": status.is_processing,
        "currentSymbol": status.current_symbol,
    }))
    .into_response())
}

async fn scheduler_status(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let status = state.scheduler()?.status().await;
    Ok(Json(json!(status)))
}

/// Run collection and analysis now, outside the schedule
async fn scheduler_run(State(state): State<AppState>) -> Result<Response, StatusCode> {
    let outcome = state.scheduler()?.run_now().await.map_err(|e| {
        error!(error = %e, "Manual daily run failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    match outcome {
        RunOutcome::Skipped => Ok(conflict("A run is already in progress, try again later")),
        RunOutcome::Completed(report) => Ok(Json(json!({
            "success": report.success(),
            "summary": report.summary(),
            "report": report,
        }))
        .into_response()),
    }
}

fn conflict(message: &str) -> Response {
    (
        StatusCode::CONFLICT,
        Json(json!({ "success": false, "message": message, "skipped": true })),
    )
        .into_response()
}

/// Classify stored candles without collecting
async fn analyze_signals(State(state): State<AppState>) -> Result<Response, StatusCode> {
    let outcome = state.pipeline()?.analyze_all().await.map_err(|e| {
        error!(error = %e, "Manual analysis failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    match outcome {
        RunOutcome::Skipped => Ok(conflict("Analysis is already in progress, try again later")),
        RunOutcome::Completed(report) => Ok(Json(json!({
            "success": report.success,
            "analyzed": report.analyzed,
            "skipped": report.skipped,
            "failed": report.failed,
            "strongBuySignals": report.strong_buy_signals,
        }))
        .into_response()),
    }
}

async fn init_signals(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    state
        .storage()?
        .init_schema()
        .await
        .map_err(storage_failure("create schema"))?;
    Ok(Json(json!({ "success": true, "message": "Schema is ready" })))
}

async fn signal_ranking(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let storage = state.storage()?;
    let (recommendations, watchlist) =
        tokio::try_join!(storage.recommended_signals(), storage.watchlist_signals())
            .map_err(storage_failure("load signal ranking"))?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "recommendations": recommendations,
            "watchlist": watchlist,
        },
        "timestamp": Utc::now(),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignalQuery {
    min_level: Option<i32>,
    date: Option<NaiveDate>,
}

/// Stored signals filtered by level and/or date
async fn list_signals(
    State(state): State<AppState>,
    Query(query): Query<SignalQuery>,
) -> Result<Response, StatusCode> {
    let storage = state.storage()?;
    let signals = match (query.min_level, query.date) {
        (Some(level), date) => storage.signals_by_level(level, date).await,
        (None, Some(date)) => storage.signals_by_date(date).await,
        (None, None) => return Ok(bad_request("minLevel or date is required")),
    }
    .map_err(storage_failure("load signals"))?;

    Ok(Json(json!({ "success": true, "data": signals })).into_response())
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn ticker_signals(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, StatusCode> {
    let symbol = normalize_symbol(&symbol);
    let storage = state.storage()?;
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    let (latest, history) = tokio::try_join!(
        storage.latest_signal(&symbol),
        storage.signal_history(&symbol, limit)
    )
    .map_err(storage_failure("load ticker signals"))?;

    Ok(Json(json!({
        "success": true,
        "symbol": symbol,
        "data": { "latest": latest, "history": history },
    })))
}

#[derive(Debug, Deserialize)]
struct AnalysisQuery {
    policy: Option<String>,
}

/// Classify a ticker from its stored candles without persisting the result
async fn live_analysis(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Response, StatusCode> {
    let symbol = normalize_symbol(&symbol);
    let preset = match query.policy.as_deref() {
        None => state.policy,
        Some(name) => match name.parse::<PolicyPreset>() {
            Ok(preset) => preset,
            Err(e) => return Ok(bad_request(e)),
        },
    };

    let candles = state
        .storage()?
        .latest_candles(&symbol, MAX_WINDOW)
        .await
        .map_err(storage_failure("load candles"))?;

    let analyzer = SignalAnalyzer::new(preset.policy());
    match analyzer.analyze(&candles) {
        Some(analysis) => Ok(Json(json!({
            "success": true,
            "symbol": symbol,
            "candles": candles.len(),
            "analysis": analysis,
        }))
        .into_response()),
        None => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "success": false,
                "symbol": symbol,
                "candles": candles.len(),
                "message": format!(
                    "{} needs at least {} daily candles",
                    symbol,
                    analyzer.policy().min_candles
                ),
            })),
        )
            .into_response()),
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/tickers", get(list_tickers).post(add_ticker))
        .route("/api/tickers/queue", get(queue_status).post(queue_action))
        .route("/api/tickers/queue/add", post(queue_add))
        .route("/api/tickers/{symbol}/analysis", get(live_analysis))
        .route("/api/scheduler", get(scheduler_status).post(scheduler_run))
        .route("/api/signals", get(list_signals))
        .route("/api/signals/analyze", post(analyze_signals))
        .route("/api/signals/init", post(init_signals))
        .route("/api/signals/ranking", get(signal_ranking))
        .route("/api/signals/{symbol}", get(ticker_signals))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port = port, "HTTP server listening on port {}", port);
    info!(
        "Metrics endpoint available at http://0.0.0.0:{}/metrics",
        port
    );
    axum::serve(listener, app).await?;

    Ok(())
}
