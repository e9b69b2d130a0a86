//! Unit tests for signal models and their persisted form

use crate::fixtures::{day, sharp_pullback_light_volume};
use serde_json::Value;
use stockpulse::models::signal::{RsiStatus, RuleStatus, TickerSignalRecord, Trend};
use stockpulse::signals::analyze_signal;

#[test]
fn test_status_text_round_trips() {
    assert_eq!("pass".parse::<RuleStatus>(), Ok(RuleStatus::Pass));
    assert_eq!("DOWN".parse::<Trend>(), Ok(Trend::Down));
    assert_eq!("OVERSOLD".parse::<RsiStatus>(), Ok(RsiStatus::Oversold));
    assert!("PASS".parse::<RuleStatus>().is_err());
    assert_eq!(RuleStatus::Warning.to_string(), "warning");
}

#[test]
fn test_analysis_serializes_camel_case_with_status_strings() {
    let analysis = analyze_signal(&sharp_pullback_light_volume()).unwrap();
    let json: Value = serde_json::to_value(&analysis).unwrap();

    assert_eq!(json["signalLevel"], 5);
    assert_eq!(json["trend"], "UP");
    assert_eq!(json["trendStatus"], "pass");
    assert_eq!(json["rsiStatus"], "OVERSOLD");
    assert_eq!(json["bbStatus"], "LOWER_TOUCH");
    assert_eq!(json["consolidationStatus"], "fail");
    assert_eq!(json["policy"], "swing");
}

#[test]
fn test_record_from_analysis_copies_fields() {
    let analysis = analyze_signal(&sharp_pullback_light_volume()).unwrap();
    let record = TickerSignalRecord::from_analysis("NVDA", day(79), &analysis);

    assert_eq!(record.symbol, "NVDA");
    assert_eq!(record.signal_date, day(79));
    assert_eq!(record.signal_level, 5);
    assert_eq!(record.score, 4);
    assert_eq!(record.trend, "UP");
    assert_eq!(record.pullback_status, "pass");
    assert_eq!(record.days_since_high, 6);
    assert_eq!(record.current_price, 132.0);
    assert!(record.id.is_none());
}
