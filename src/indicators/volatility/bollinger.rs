//! Bollinger Bands indicator

use crate::common::math;
use crate::indicators::ensure_ascending;
use crate::models::indicators::{BollingerBands, BollingerPoint, Candle};

/// Calculate Bollinger Bands
///
/// Middle Band = SMA(period)
/// Upper Band = Middle + (std_dev * population standard deviation)
/// Lower Band = Middle - (std_dev * population standard deviation)
pub fn calculate_bollinger_bands(
    candles: &[Candle],
    period: u32,
    std_dev: f64,
) -> Vec<BollingerPoint> {
    let candles = ensure_ascending(candles);
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let period = period as usize;

    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let bands = if period == 0 || i + 1 < period {
                None
            } else {
                let window = &closes[i + 1 - period..=i];
                math::mean(window)
                    .zip(math::population_std_dev(window))
                    .map(|(middle, sigma)| BollingerBands {
                        upper: middle + std_dev * sigma,
                        middle,
                        lower: middle - std_dev * sigma,
                    })
            };
            BollingerPoint {
                time: c.time,
                bands,
            }
        })
        .collect()
}

/// Calculate Bollinger Bands with default parameters (20 SMA, 2σ)
pub fn calculate_bollinger_bands_default(candles: &[Candle]) -> Vec<BollingerPoint> {
    calculate_bollinger_bands(candles, 20, 2.0)
}
