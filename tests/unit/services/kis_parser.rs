//! Unit tests for the KIS raw candle boundary

use chrono::NaiveDate;
use stockpulse::services::kis::parser::{parse_daily_candles, parse_date, parse_quote, IssueKind};
use stockpulse::services::kis::types::{RawDailyCandle, RawQuote};

fn raw(xymd: &str, close: &str, volume: &str) -> RawDailyCandle {
    RawDailyCandle {
        xymd: Some(xymd.to_string()),
        xhms: None,
        open: Some("100.5".to_string()),
        high: Some("102".to_string()),
        low: Some("99.25".to_string()),
        clos: Some(close.to_string()),
        tvol: Some(volume.to_string()),
    }
}

#[test]
fn test_parse_date_format() {
    assert_eq!(parse_date("20240315"), NaiveDate::from_ymd_opt(2024, 3, 15));
    assert_eq!(parse_date("2024-03-15"), None);
    assert_eq!(parse_date("20241340"), None);
}

#[test]
fn test_well_formed_rows_convert() {
    let parsed = parse_daily_candles(&[raw("20240315", "101.75", "1,234,567")]);

    assert!(parsed.issues.is_empty());
    let candle = &parsed.candles[0];
    assert_eq!(candle.time, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    assert_eq!(candle.open, 100.5);
    assert_eq!(candle.close, 101.75);
    assert_eq!(candle.volume, 1_234_567);
}

#[test]
fn test_rows_without_usable_date_are_dropped() {
    let mut missing = raw("20240315", "1", "1");
    missing.xymd = None;
    let rows = [missing, raw("not-a-date", "1", "1"), raw("20240314", "1", "1")];

    let parsed = parse_daily_candles(&rows);
    assert_eq!(parsed.candles.len(), 1);
    assert_eq!(parsed.issues.len(), 2);
    assert_eq!(parsed.issues[0].kind, IssueKind::Missing);
    assert_eq!(parsed.issues[1].kind, IssueKind::InvalidDate);
}

#[test]
fn test_bad_numbers_become_zero_and_are_reported() {
    let mut row = raw("20240315", "n/a", "");
    row.high = None;

    let parsed = parse_daily_candles(&[row]);
    let candle = &parsed.candles[0];
    assert_eq!(candle.close, 0.0);
    assert_eq!(candle.high, 0.0);
    assert_eq!(candle.volume, 0);

    let fields: Vec<(&str, IssueKind)> = parsed.issues.iter().map(|i| (i.field, i.kind)).collect();
    assert_eq!(
        fields,
        vec![
            ("high", IssueKind::Missing),
            ("clos", IssueKind::Unparsable),
            ("tvol", IssueKind::Missing),
        ]
    );
    assert_eq!(parsed.issues[1].raw.as_deref(), Some("n/a"));
    assert_eq!(parsed.issues[1].date.as_deref(), Some("20240315"));
}

#[test]
fn test_parse_quote_requires_last_price() {
    let quote = parse_quote(&RawQuote {
        last: Some("187.5".to_string()),
        base: Some("185".to_string()),
        diff: Some("2.5".to_string()),
        rate: Some("1.35".to_string()),
        tvol: Some("42000".to_string()),
    })
    .unwrap();
    assert_eq!(quote.last, 187.5);
    assert_eq!(quote.previous_close, 185.0);
    assert_eq!(quote.volume, 42_000);

    assert!(parse_quote(&RawQuote::default()).is_none());
}
