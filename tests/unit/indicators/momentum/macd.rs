//! Unit tests for MACD indicator

use crate::fixtures::candles_from_closes;
use stockpulse::indicators::{calculate_macd, calculate_macd_default};

#[test]
fn test_macd_warm_up_follows_slow_and_signal_periods() {
    let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
    let macd = calculate_macd_default(&candles_from_closes(&closes));

    assert_eq!(macd.len(), 40);
    assert!(macd[24].macd.is_none());
    assert!(macd[25].macd.is_some());
    assert!(macd[32].signal.is_none());
    assert!(macd[33].signal.is_some());
    assert!(macd[32].histogram.is_none());
}

#[test]
fn test_macd_histogram_is_line_minus_signal() {
    let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
    let macd = calculate_macd_default(&candles_from_closes(&closes));

    for point in &macd[33..] {
        let expected = point.macd.unwrap() - point.signal.unwrap();
        assert!((point.histogram.unwrap() - expected).abs() < 1e-12);
        assert!(point.histogram.unwrap() > 0.0);
    }
}

#[test]
fn test_macd_flat_series_is_zero() {
    let macd = calculate_macd(&candles_from_closes(&[20.0; 20]), 3, 5, 2);

    let last = macd.last().unwrap();
    assert_eq!(last.macd, Some(0.0));
    assert_eq!(last.signal, Some(0.0));
    assert_eq!(last.histogram, Some(0.0));
}
