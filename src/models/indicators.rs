use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLCV observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64, volume: u64, time: NaiveDate) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// A single indicator value; `value` is `None` during warm-up
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub time: NaiveDate,
    pub value: Option<f64>,
}

impl IndicatorPoint {
    pub fn new(time: NaiveDate, value: Option<f64>) -> Self {
        Self { time, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub time: NaiveDate,
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

impl MacdPoint {
    /// Histogram is derived, so it exists exactly when both lines do
    pub fn new(time: NaiveDate, macd: Option<f64>, signal: Option<f64>) -> Self {
        let histogram = match (macd, signal) {
            (Some(m), Some(s)) => Some(m - s),
            _ => None,
        };
        Self {
            time,
            macd,
            signal,
            histogram,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerPoint {
    pub time: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bands: Option<BollingerBands>,
}

/// Every series computed over one candle history, aligned index-for-index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub sma20: Vec<IndicatorPoint>,
    pub sma60: Vec<IndicatorPoint>,
    pub macd: Vec<MacdPoint>,
    pub bollinger_bands: Vec<BollingerPoint>,
    pub rsi: Vec<IndicatorPoint>,
}

impl IndicatorSet {
    pub fn latest_macd(&self) -> Option<&MacdPoint> {
        self.macd.last()
    }

    pub fn previous_macd(&self) -> Option<&MacdPoint> {
        self.macd.iter().rev().nth(1)
    }

    pub fn latest_bollinger(&self) -> Option<&BollingerPoint> {
        self.bollinger_bands.last()
    }
}
