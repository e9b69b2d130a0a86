//! Indicator engine: pure functions producing time-aligned series over a candle history.
//!
//! Every calculation accepts candles in either order and evaluates them oldest
//! first. Output vectors are as long as the input; `None` marks warm-up.

use std::borrow::Cow;

use crate::models::indicators::{Candle, IndicatorSet};

pub mod momentum;
pub mod trend;
pub mod volatility;

pub use momentum::*;
pub use trend::*;
pub use volatility::*;

/// Candles in ascending date order, borrowed when they already are
pub fn ensure_ascending(candles: &[Candle]) -> Cow<'_, [Candle]> {
    if candles.windows(2).all(|w| w[0].time <= w[1].time) {
        Cow::Borrowed(candles)
    } else {
        let mut sorted = candles.to_vec();
        sorted.sort_by_key(|c| c.time);
        Cow::Owned(sorted)
    }
}

/// Compute the full indicator set used by the signal classifier
pub fn calculate_all(candles: &[Candle]) -> IndicatorSet {
    let candles = ensure_ascending(candles);
    IndicatorSet {
        sma20: calculate_sma(&candles, 20),
        sma60: calculate_sma(&candles, 60),
        macd: calculate_macd_default(&candles),
        bollinger_bands: calculate_bollinger_bands_default(&candles),
        rsi: calculate_rsi_default(&candles),
    }
}
