//! Unit tests for Bollinger Bands indicator

use crate::fixtures::candles_from_closes;
use stockpulse::indicators::{calculate_bollinger_bands, calculate_bollinger_bands_default};

#[test]
fn test_bollinger_uses_population_std_dev() {
    let candles = candles_from_closes(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
    let bands = calculate_bollinger_bands(&candles, 8, 2.0);

    let last = bands.last().unwrap().bands.unwrap();
    assert_eq!(last.middle, 5.0);
    assert_eq!(last.upper, 9.0);
    assert_eq!(last.lower, 1.0);
    assert!(bands[6].bands.is_none());
}

#[test]
fn test_bollinger_flat_series_collapses() {
    let bands = calculate_bollinger_bands_default(&candles_from_closes(&[30.0; 25]));

    assert!(bands[18].bands.is_none());
    let last = bands[24].bands.unwrap();
    assert_eq!((last.lower, last.middle, last.upper), (30.0, 30.0, 30.0));
}
