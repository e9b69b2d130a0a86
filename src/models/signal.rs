//! Signal analysis output and its persisted form

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a single rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Pass,
    Warning,
    Fail,
}

impl RuleStatus {
    pub fn from_pass(passed: bool) -> Self {
        if passed {
            RuleStatus::Pass
        } else {
            RuleStatus::Fail
        }
    }

    pub fn is_pass(self) -> bool {
        self == RuleStatus::Pass
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuleStatus::Pass => "pass",
            RuleStatus::Warning => "warning",
            RuleStatus::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Up => "UP",
            Trend::Down => "DOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RsiStatus {
    Oversold,
    Overbought,
    Neutral,
}

impl RsiStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RsiStatus::Oversold => "OVERSOLD",
            RsiStatus::Overbought => "OVERBOUGHT",
            RsiStatus::Neutral => "NEUTRAL",
        }
    }
}

/// Where the latest close sits relative to the Bollinger Bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BollingerStatus {
    UpperTouch,
    LowerTouch,
    LowerHalf,
    UpperHalf,
    Middle,
}

macro_rules! impl_status_parse {
    ($ty:ty, $($text:literal => $variant:expr),+ $(,)?) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($variant),)+
                    other => Err(format!("unknown {}: {}", stringify!($ty), other)),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_status_parse!(RuleStatus, "pass" => RuleStatus::Pass, "warning" => RuleStatus::Warning, "fail" => RuleStatus::Fail);
impl_status_parse!(Trend, "UP" => Trend::Up, "DOWN" => Trend::Down);
impl_status_parse!(
    RsiStatus,
    "OVERSOLD" => RsiStatus::Oversold,
    "OVERBOUGHT" => RsiStatus::Overbought,
    "NEUTRAL" => RsiStatus::Neutral,
);

/// Classifier result for one ticker on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalAnalysis {
    pub signal_level: u8,
    pub signal_keyword: String,
    pub signal_message: String,
    pub policy: String,

    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
    pub trend: Trend,
    pub trend_status: RuleStatus,

    pub rsi: f64,
    pub rsi_status: RsiStatus,

    pub pullback_rate: f64,
    pub pullback_status: RuleStatus,

    pub volume_ratio: f64,
    pub volume_status: RuleStatus,

    pub days_since_high: i64,
    pub duration_status: RuleStatus,

    pub consolidation_rate: f64,
    pub consolidation_status: RuleStatus,

    pub macd_bullish: bool,
    pub macd_turn: bool,
    pub bb_status: BollingerStatus,

    pub current_price: f64,
    pub high_2w: f64,
    pub high_2w_date: Option<NaiveDate>,
    pub high_52w: f64,
    pub as_of: NaiveDate,

    pub score: u8,
}

impl SignalAnalysis {
    /// The five scored rules, in display order
    pub fn rule_statuses(&self) -> [RuleStatus; 5] {
        [
            self.trend_status,
            self.pullback_status,
            self.volume_status,
            self.duration_status,
            self.consolidation_status,
        ]
    }

    pub fn is_strong_buy(&self) -> bool {
        self.signal_level >= 5
    }
}

/// Row of the `ticker_signals` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSignalRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub symbol: String,
    pub signal_date: NaiveDate,
    pub signal_level: i32,
    pub signal_keyword: String,
    pub signal_message: String,
    pub trend: String,
    pub trend_status: String,
    pub rsi: f64,
    pub rsi_status: String,
    pub pullback_rate: f64,
    pub pullback_status: String,
    pub volume_ratio: f64,
    pub volume_status: String,
    pub days_since_high: i32,
    pub duration_status: String,
    pub consolidation_rate: f64,
    pub consolidation_status: String,
    pub score: i32,
    pub current_price: f64,
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
    pub high_2w: f64,
    pub high_52w: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TickerSignalRecord {
    pub fn from_analysis(symbol: &str, signal_date: NaiveDate, analysis: &SignalAnalysis) -> Self {
        Self {
            id: None,
            symbol: symbol.to_string(),
            signal_date,
            signal_level: i32::from(analysis.signal_level),
            signal_keyword: analysis.signal_keyword.clone(),
            signal_message: analysis.signal_message.clone(),
            trend: analysis.trend.to_string(),
            trend_status: analysis.trend_status.to_string(),
            rsi: analysis.rsi,
            rsi_status: analysis.rsi_status.to_string(),
            pullback_rate: analysis.pullback_rate,
            pullback_status: analysis.pullback_status.to_string(),
            volume_ratio: analysis.volume_ratio,
            volume_status: analysis.volume_status.to_string(),
            days_since_high: i32::try_from(analysis.days_since_high).unwrap_or(i32::MAX),
            duration_status: analysis.duration_status.to_string(),
            consolidation_rate: analysis.consolidation_rate,
            consolidation_status: analysis.consolidation_status.to_string(),
            score: i32::from(analysis.score),
            current_price: analysis.current_price,
            ma20: analysis.ma20,
            ma60: analysis.ma60,
            high_2w: analysis.high_2w,
            high_52w: analysis.high_52w,
            created_at: None,
        }
    }
}
