//! SMA (Simple Moving Average) indicator

use crate::common::math;
use crate::indicators::ensure_ascending;
use crate::models::indicators::{Candle, IndicatorPoint};

/// Trailing-window means over raw values, `None` until `period` values are available
pub fn sma_series(values: &[f64], period: u32) -> Vec<Option<f64>> {
    let period = period as usize;
    (0..values.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                None
            } else {
                math::mean(&values[i + 1 - period..=i])
            }
        })
        .collect()
}

/// Calculate SMA of closes for a specific period
pub fn calculate_sma(candles: &[Candle], period: u32) -> Vec<IndicatorPoint> {
    let candles = ensure_ascending(candles);
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    candles
        .iter()
        .zip(sma_series(&closes, period))
        .map(|(c, value)| IndicatorPoint::new(c.time, value))
        .collect()
}
