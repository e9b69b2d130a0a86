//! EMA (Exponential Moving Average) indicator

use crate::common::math;
use crate::indicators::ensure_ascending;
use crate::models::indicators::{Candle, IndicatorPoint};

/// EMA over raw values, seeded with the first value.
///
/// The recurrence runs from index 0; indices before `period - 1` are masked
/// in the output only.
pub fn ema_series(values: &[f64], period: u32) -> Vec<Option<f64>> {
    let Some(&seed) = values.first() else {
        return Vec::new();
    };
    if period == 0 {
        return vec![None; values.len()];
    }

    let k = math::ema_smoothing(period as usize);
    let warm_up = period as usize - 1;
    let mut previous = seed;

    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            if i > 0 {
                previous = math::ema_step(value, previous, k);
            }
            (i >= warm_up).then_some(previous)
        })
        .collect()
}

/// Calculate EMA of closes for a specific period
pub fn calculate_ema(candles: &[Candle], period: u32) -> Vec<IndicatorPoint> {
    let candles = ensure_ascending(candles);
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    candles
        .iter()
        .zip(ema_series(&closes, period))
        .map(|(c, value)| IndicatorPoint::new(c.time, value))
        .collect()
}

