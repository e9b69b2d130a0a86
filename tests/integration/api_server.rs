//! Integration tests for the API Server
//!
//! Exercises the router over in-memory storage and a scripted candle source.

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{json, Value};
use stockpulse::config::DEFAULT_COLLECT_SCHEDULE;
use stockpulse::core::http::{create_router, AppState};
use stockpulse::core::scheduler::DailyScheduler;
use stockpulse::db::Storage;
use stockpulse::jobs::{SignalPipeline, TickerInitQueue};

use crate::test_utils::{
    day, downtrend_history, flat_history, strong_buy_history, FakeCandleSource, TestContext,
};

struct TestApiServer {
    server: TestServer,
    env: TestContext,
    pipeline: Arc<SignalPipeline>,
}

impl TestApiServer {
    fn new(source: FakeCandleSource) -> Self {
        let env = TestContext::new(source);
        let pipeline = Arc::new(SignalPipeline::new(env.ctx.clone()));
        let queue = TickerInitQueue::new(env.ctx.clone());
        let scheduler = Arc::new(
            DailyScheduler::new(pipeline.clone(), DEFAULT_COLLECT_SCHEDULE).expect("scheduler"),
        );

        let state = AppState::new(env.metrics.clone())
            .with_storage(env.storage.clone())
            .with_pipeline(pipeline.clone())
            .with_queue(queue)
            .with_scheduler(scheduler);
        let server = TestServer::new(create_router(state)).expect("start test server");

        Self {
            server,
            env,
            pipeline,
        }
    }
}

#[tokio::test]
async fn health_endpoint_reports_healthy_status() {
    let app = TestApiServer::new(FakeCandleSource::new());
    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime_seconds"].as_u64().is_some());
    assert_eq!(body["service"], "stockpulse");
}

#[tokio::test]
async fn metrics_endpoint_exposes_prometheus_metrics() {
    let app = TestApiServer::new(FakeCandleSource::new());
    app.server.get("/health").await;

    let body = app.server.get("/metrics").await.text();
    assert!(body.contains("http_requests_total"));
    assert!(body.contains("http_request_duration_seconds"));
    assert!(body.contains("candles_saved_total"));
}

#[tokio::test]
async fn missing_storage_is_service_unavailable() {
    let env = TestContext::new(FakeCandleSource::new());
    let server = TestServer::new(create_router(AppState::new(env.metrics.clone()))).unwrap();

    let response = server.get("/api/tickers").await;
    assert_eq!(response.status_code(), 503);
}

#[tokio::test]
async fn register_and_list_tickers() {
    let app = TestApiServer::new(FakeCandleSource::new());

    let response = app
        .server
        .post("/api/tickers")
        .json(&json!({ "symbol": " nvda ", "name": "NVIDIA" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["ticker"]["symbol"], "NVDA");
    assert_eq!(body["ticker"]["exchange"], "NAS");

    app.server
        .post("/api/tickers")
        .json(&json!({ "symbol": "NVDA", "exchange": "nys" }))
        .await;

    let body: Value = app.server.get("/api/tickers").await.json();
    let tickers = body["tickers"].as_array().unwrap();
    assert_eq!(tickers.len(), 1);
    assert_eq!(tickers[0]["exchange"], "NYS");
    assert_eq!(tickers[0]["name"], "NVIDIA");
}

#[tokio::test]
async fn register_ticker_validates_input() {
    let app = TestApiServer::new(FakeCandleSource::new());

    let missing = app.server.post("/api/tickers").json(&json!({})).await;
    assert_eq!(missing.status_code(), 400);

    let bad_exchange = app
        .server
        .post("/api/tickers")
        .json(&json!({ "symbol": "NVDA", "exchange": "LSE" }))
        .await;
    assert_eq!(bad_exchange.status_code(), 400);
}

#[tokio::test]
async fn queue_add_reports_status_and_backfills() {
    let app = TestApiServer::new(
        FakeCandleSource::new().with_candles("AAPL", flat_history(120)),
    );

    let response = app
        .server
        .post("/api/tickers/queue/add")
        .json(&json!({ "symbol": "aapl" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert!(body.get("queueLength").is_some());
    assert!(body.get("isProcessing").is_some());

    crate::test_utils::wait_for(|| app.env.source.calls() == vec!["AAPL"]).await;
    let mut processed = 0;
    for _ in 0..200 {
        let status: Value = app.server.get("/api/tickers/queue").await.json();
        processed = status["processed"].as_u64().unwrap();
        if processed == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(processed, 1);
    assert_eq!(app.env.storage.candle_count("AAPL").await, 120);
}

#[tokio::test]
async fn queue_actions() {
    let app = TestApiServer::new(FakeCandleSource::new());

    for action in ["clear", "resetStats"] {
        let response = app
            .server
            .post("/api/tickers/queue")
            .json(&json!({ "action": action }))
            .await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.json::<Value>()["success"], true);
    }

    let invalid = app
        .server
        .post("/api/tickers/queue")
        .json(&json!({ "action": "explode" }))
        .await;
    assert_eq!(invalid.status_code(), 400);

    let status: Value = app.server.get("/api/tickers/queue").await.json();
    assert_eq!(status["queueLength"], 0);
    assert_eq!(status["isProcessing"], false);
}

#[tokio::test]
async fn analyze_endpoint_runs_classification() {
    let app = TestApiServer::new(FakeCandleSource::new());
    app.env.add_ticker("NVDA").await;
    app.env.seed_candles("NVDA", &strong_buy_history()).await;

    let response = app.server.post("/api/signals/analyze").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["analyzed"], 1);
    assert_eq!(body["strongBuySignals"], json!(["NVDA"]));
}

#[tokio::test]
async fn analyze_endpoint_conflicts_while_running() {
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    let app = TestApiServer::new(
        FakeCandleSource::new()
            .with_candles("AAPL", flat_history(40))
            .gated(gate.clone()),
    );
    app.env.add_ticker("AAPL").await;

    let pipeline = app.pipeline.clone();
    let running = tokio::spawn(async move { pipeline.run_daily().await });
    let source = app.env.source.clone();
    crate::test_utils::wait_for(|| !source.calls().is_empty()).await;

    let response = app.server.post("/api/signals/analyze").await;
    assert_eq!(response.status_code(), 409);
    let body: Value = response.json();
    assert_eq!(body["skipped"], true);
    assert_eq!(body["success"], false);

    let scheduler = app.server.post("/api/scheduler").await;
    assert_eq!(scheduler.status_code(), 409);

    gate.add_permits(10);
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn scheduler_status_and_manual_run() {
    let app = TestApiServer::new(FakeCandleSource::new().with_candles("INTC", downtrend_history()));
    app.env.add_ticker("INTC").await;

    let status: Value = app.server.get("/api/scheduler").await.json();
    assert_eq!(status["isRunning"], false);
    assert_eq!(status["schedule"], DEFAULT_COLLECT_SCHEDULE);
    assert_eq!(status["lastRun"], Value::Null);

    let response = app.server.post("/api/scheduler").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["report"]["collect"]["totalSaved"], 30);
    assert!(body["summary"].as_str().unwrap().contains("Strong buy: none"));

    let status: Value = app.server.get("/api/scheduler").await.json();
    assert_eq!(status["lastRun"]["totalTickers"], 1);
}

#[tokio::test]
async fn ranking_splits_recommendations_and_watchlist() {
    let app = TestApiServer::new(FakeCandleSource::new());
    app.env.add_ticker("NVDA").await;
    app.env.add_ticker("INTC").await;
    app.env.seed_candles("NVDA", &strong_buy_history()).await;
    app.env.seed_candles("INTC", &downtrend_history()).await;
    app.pipeline.analyze_all_on(day(79)).await.unwrap();

    let body: Value = app.server.get("/api/signals/ranking").await.json();
    assert_eq!(body["success"], true);
    let recommendations = body["data"]["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0]["symbol"], "NVDA");
    assert_eq!(recommendations[0]["signal_level"], 5);
    assert!(body["data"]["watchlist"].as_array().unwrap().is_empty());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn signal_queries_by_level_date_and_symbol() {
    let app = TestApiServer::new(FakeCandleSource::new());
    app.env.add_ticker("NVDA").await;
    app.env.add_ticker("INTC").await;
    app.env.seed_candles("NVDA", &strong_buy_history()).await;
    app.env.seed_candles("INTC", &downtrend_history()).await;
    app.pipeline.analyze_all_on(day(78)).await.unwrap();
    app.pipeline.analyze_all_on(day(79)).await.unwrap();

    let by_level: Value = app
        .server
        .get("/api/signals")
        .add_query_param("minLevel", 4)
        .await
        .json();
    let rows = by_level["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["signal_date"], "2024-03-20");

    let by_date: Value = app
        .server
        .get("/api/signals")
        .add_query_param("date", "2024-03-19")
        .await
        .json();
    assert_eq!(by_date["data"].as_array().unwrap().len(), 2);
    assert_eq!(by_date["data"][0]["symbol"], "NVDA");

    let missing = app.server.get("/api/signals").await;
    assert_eq!(missing.status_code(), 400);

    let history: Value = app.server.get("/api/signals/nvda").await.json();
    assert_eq!(history["symbol"], "NVDA");
    assert_eq!(history["data"]["latest"]["signal_date"], "2024-03-20");
    assert_eq!(history["data"]["history"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn live_analysis_honours_policy_query() {
    let app = TestApiServer::new(FakeCandleSource::new());
    app.env.seed_candles("NVDA", &strong_buy_history()).await;

    let swing: Value = app.server.get("/api/tickers/NVDA/analysis").await.json();
    assert_eq!(swing["analysis"]["policy"], "swing");
    assert_eq!(swing["analysis"]["score"], 4);

    let short: Value = app
        .server
        .get("/api/tickers/nvda/analysis")
        .add_query_param("policy", "short_term")
        .await
        .json();
    assert_eq!(short["analysis"]["policy"], "short_term");
    assert_eq!(short["analysis"]["pullbackStatus"], "fail");

    let unknown = app
        .server
        .get("/api/tickers/NVDA/analysis")
        .add_query_param("policy", "yolo")
        .await;
    assert_eq!(unknown.status_code(), 400);

    let too_short = app.server.get("/api/tickers/NEW/analysis").await;
    assert_eq!(too_short.status_code(), 422);

    assert!(app.env.storage.latest_signal("NVDA").await.unwrap().is_none());
}

#[tokio::test]
async fn init_endpoint_prepares_schema() {
    let app = TestApiServer::new(FakeCandleSource::new());
    let body: Value = app.server.post("/api/signals/init").await.json();
    assert_eq!(body["success"], true);
}
