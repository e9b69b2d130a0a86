//! Job context for dependency injection

use std::sync::Arc;

use crate::db::Storage;
use crate::metrics::Metrics;
use crate::services::market_data::CandleSource;
use crate::services::notifier::Notifier;
use crate::signals::engine::SignalAnalyzer;

/// Shared dependencies of the pipeline and the init queue.
///
/// Built once at process start; every collaborator is an explicit object.
pub struct JobContext {
    pub candle_source: Arc<dyn CandleSource>,
    pub storage: Arc<dyn Storage>,
    pub analyzer: SignalAnalyzer,
    pub metrics: Option<Arc<Metrics>>,
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl JobContext {
    pub fn new(
        candle_source: Arc<dyn CandleSource>,
        storage: Arc<dyn Storage>,
        analyzer: SignalAnalyzer,
    ) -> Self {
        Self {
            candle_source,
            storage,
            analyzer,
            metrics: None,
            notifier: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub(crate) fn record_failure(&self, stage: &str) {
        if let Some(metrics) = &self.metrics {
            metrics
                .pipeline_failures_total
                .with_label_values(&[stage])
                .inc();
        }
    }
}
