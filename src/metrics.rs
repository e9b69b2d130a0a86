//! Prometheus metrics registry

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    pub http_requests_total: IntCounter,
    pub http_request_duration_seconds: Histogram,
    pub http_requests_in_flight: IntGauge,
    /// Labelled by resulting signal level
    pub signal_evaluations_total: IntCounterVec,
    pub signals_skipped_total: IntCounter,
    pub candles_saved_total: IntCounter,
    /// Labelled by stage (`collect`, `analyze`, `init`)
    pub pipeline_failures_total: IntCounterVec,
    /// Labelled by run kind and outcome (`completed`, `skipped`)
    pub pipeline_runs_total: IntCounterVec,
    /// Labelled by raw field name
    pub data_quality_issues_total: IntCounterVec,
    pub database_connected: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total =
            IntCounter::new("http_requests_total", "Total number of HTTP requests")?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        ))?;
        let http_requests_in_flight =
            IntGauge::new("http_requests_in_flight", "HTTP requests currently being served")?;
        let signal_evaluations_total = IntCounterVec::new(
            Opts::new("signal_evaluations_total", "Signals classified, by level"),
            &["level"],
        )?;
        let signals_skipped_total = IntCounter::new(
            "signals_skipped_total",
            "Tickers skipped for insufficient candle history",
        )?;
        let candles_saved_total =
            IntCounter::new("candles_saved_total", "Candle rows written to storage")?;
        let pipeline_failures_total = IntCounterVec::new(
            Opts::new("pipeline_failures_total", "Per-ticker pipeline failures"),
            &["stage"],
        )?;
        let pipeline_runs_total = IntCounterVec::new(
            Opts::new("pipeline_runs_total", "Pipeline runs by kind and outcome"),
            &["kind", "outcome"],
        )?;
        let data_quality_issues_total = IntCounterVec::new(
            Opts::new(
                "data_quality_issues_total",
                "Raw candle fields that failed to parse",
            ),
            &["field"],
        )?;
        let database_connected =
            IntGauge::new("database_connected", "1 when the database is reachable")?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(signal_evaluations_total.clone()))?;
        registry.register(Box::new(signals_skipped_total.clone()))?;
        registry.register(Box::new(candles_saved_total.clone()))?;
        registry.register(Box::new(pipeline_failures_total.clone()))?;
        registry.register(Box::new(pipeline_runs_total.clone()))?;
        registry.register(Box::new(data_quality_issues_total.clone()))?;
        registry.register(Box::new(database_connected.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            signal_evaluations_total,
            signals_skipped_total,
            candles_saved_total,
            pipeline_failures_total,
            pipeline_runs_total,
            data_quality_issues_total,
            database_connected,
        })
    }

    /// Render all metrics in the Prometheus text format
    pub fn export(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
