//! RSI (Relative Strength Index) indicator

use chrono::NaiveDate;

use crate::indicators::ensure_ascending;
use crate::models::indicators::{Candle, IndicatorPoint};

/// Calculate RSI with Wilder smoothing, aligned index-for-index with the candles
///
/// RSI = 100 - (100 / (1 + RS))
/// RS = Average Gain / Average Loss
///
/// The first value sits at index `period`, seeded from simple averages over
/// changes `1..=period`. A zero average loss reads as 100.
pub fn calculate_rsi(candles: &[Candle], period: u32) -> Vec<IndicatorPoint> {
    let candles = ensure_ascending(candles);
    let mut points: Vec<IndicatorPoint> = candles
        .iter()
        .map(|c| IndicatorPoint::new(c.time, None))
        .collect();

    let period = period as usize;
    if period == 0 || candles.len() <= period {
        return points;
    }

    let change = |i: usize| candles[i].close - candles[i - 1].close;

    let (mut avg_gain, mut avg_loss) = (1..=period).fold((0.0, 0.0), |(g, l), i| {
        let ch = change(i);
        if ch > 0.0 {
            (g + ch, l)
        } else {
            (g, l - ch)
        }
    });
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    points[period].value = Some(rsi_value(avg_gain, avg_loss));

    let n = period as f64;
    for i in period + 1..candles.len() {
        let ch = change(i);
        avg_gain = (avg_gain * (n - 1.0) + ch.max(0.0)) / n;
        avg_loss = (avg_loss * (n - 1.0) + (-ch).max(0.0)) / n;
        points[i].value = Some(rsi_value(avg_gain, avg_loss));
    }

    points
}

/// Calculate RSI with default period (14)
pub fn calculate_rsi_default(candles: &[Candle]) -> Vec<IndicatorPoint> {
    calculate_rsi(candles, 14)
}

/// RSI value recorded for `date`, if the series has one
pub fn rsi_at(series: &[IndicatorPoint], date: NaiveDate) -> Option<f64> {
    series
        .binary_search_by(|p| p.time.cmp(&date))
        .ok()
        .and_then(|i| series[i].value)
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}
