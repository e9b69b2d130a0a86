//! Run reports for the collection and analysis jobs

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Result of a guarded run: either it ran, or another run of the same kind was active
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "report", rename_all = "lowercase")]
pub enum RunOutcome<T> {
    Skipped,
    Completed(T),
}

impl<T> RunOutcome<T> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, RunOutcome::Skipped)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            RunOutcome::Completed(report) => Some(report),
            RunOutcome::Skipped => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectResult {
    pub symbol: String,
    pub saved: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectReport {
    pub success: bool,
    pub total_tickers: usize,
    pub total_saved: u64,
    pub errors: usize,
    pub duration_ms: u64,
    pub results: Vec<CollectResult>,
}

impl CollectReport {
    pub fn from_results(results: Vec<CollectResult>, duration_ms: u64) -> Self {
        let errors = results.iter().filter(|r| r.error.is_some()).count();
        Self {
            success: errors == 0,
            total_tickers: results.len(),
            total_saved: results.iter().map(|r| r.saved).sum(),
            errors,
            duration_ms,
            results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    /// Not enough candle history to classify
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeReport {
    pub success: bool,
    pub signal_date: NaiveDate,
    pub analyzed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub strong_buy_signals: Vec<String>,
    pub duration_ms: u64,
    pub results: Vec<AnalyzeResult>,
}

impl AnalyzeReport {
    pub fn from_results(signal_date: NaiveDate, results: Vec<AnalyzeResult>, duration_ms: u64) -> Self {
        let failed = results.iter().filter(|r| r.error.is_some()).count();
        let skipped = results.iter().filter(|r| r.skipped).count();
        let strong_buy_signals = results
            .iter()
            .filter(|r| r.signal_level.is_some_and(|level| level >= 5))
            .map(|r| r.symbol.clone())
            .collect();

        Self {
            success: failed == 0,
            signal_date,
            analyzed: results.len() - failed - skipped,
            skipped,
            failed,
            strong_buy_signals,
            duration_ms,
            results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub started_at: DateTime<Utc>,
    pub collect: CollectReport,
    pub analyze: AnalyzeReport,
}

impl DailyReport {
    pub fn success(&self) -> bool {
        self.collect.success && self.analyze.success
    }

    /// Plain-text digest for a push notification
    pub fn summary(&self) -> String {
        let mut text = format!("📈 Daily signal run {}\n", self.analyze.signal_date);
        let _ = writeln!(
            text,
            "Collected: {} tickers, {} candles, {} errors",
            self.collect.total_tickers, self.collect.total_saved, self.collect.errors
        );
        let _ = writeln!(
            text,
            "Analyzed: {} ok, {} skipped, {} failed",
            self.analyze.analyzed, self.analyze.skipped, self.analyze.failed
        );

        if self.analyze.strong_buy_signals.is_empty() {
            text.push_str("Strong buy: none");
        } else {
            let _ = write!(
                text,
                "Strong buy: {}",
                self.analyze.strong_buy_signals.join(", ")
            );
        }
        text
    }
}
