//! MACD (Moving Average Convergence Divergence) indicator

use crate::indicators::ensure_ascending;
use crate::indicators::trend::ema_series;
use crate::models::indicators::{Candle, MacdPoint};

/// Calculate MACD series
///
/// MACD = EMA(fast) - EMA(slow)
/// Signal = EMA(signal) of MACD, started at the first defined MACD value
/// Histogram = MACD - Signal
pub fn calculate_macd(
    candles: &[Candle],
    fast_period: u32,
    slow_period: u32,
    signal_period: u32,
) -> Vec<MacdPoint> {
    let candles = ensure_ascending(candles);
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let fast = ema_series(&closes, fast_period);
    let slow = ema_series(&closes, slow_period);
    let line: Vec<Option<f64>> = fast
        .iter()
        .zip(&slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let mut signal = vec![None; line.len()];
    if let Some(first) = line.iter().position(Option::is_some) {
        let tail: Vec<f64> = line[first..].iter().map(|v| v.unwrap_or(0.0)).collect();
        for (offset, value) in ema_series(&tail, signal_period).into_iter().enumerate() {
            signal[first + offset] = value;
        }
    }

    candles
        .iter()
        .zip(line.into_iter().zip(signal))
        .map(|(c, (macd, signal))| MacdPoint::new(c.time, macd, signal))
        .collect()
}

/// Calculate MACD with default periods (12, 26, 9)
pub fn calculate_macd_default(candles: &[Candle]) -> Vec<MacdPoint> {
    calculate_macd(candles, 12, 26, 9)
}
