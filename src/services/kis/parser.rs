//! Conversion from raw KIS strings to strict candles.
//!
//! Rows without a usable date are dropped. Numeric fields that are missing or
//! do not parse become 0 and are reported as `DataIssue`s so the caller can
//! surface them.

use chrono::NaiveDate;
use serde::Serialize;

use super::types::{RawDailyCandle, RawQuote, Quote};
use crate::models::indicators::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Missing,
    Unparsable,
    InvalidDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataIssue {
    /// Raw `xymd` of the offending row
    pub date: Option<String>,
    pub field: &'static str,
    pub raw: Option<String>,
    pub kind: IssueKind,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedCandles {
    pub candles: Vec<Candle>,
    pub issues: Vec<DataIssue>,
}

/// `YYYYMMDD`
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y%m%d").ok()
}

pub fn parse_daily_candles(rows: &[RawDailyCandle]) -> ParsedCandles {
    let mut parsed = ParsedCandles::default();

    for row in rows {
        let date = match row.xymd.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text,
            _ => {
                parsed.issues.push(DataIssue {
                    date: None,
                    field: "xymd",
                    raw: None,
                    kind: IssueKind::Missing,
                });
                continue;
            }
        };
        let Some(time) = parse_date(date) else {
            parsed.issues.push(DataIssue {
                date: Some(date.to_string()),
                field: "xymd",
                raw: Some(date.to_string()),
                kind: IssueKind::InvalidDate,
            });
            continue;
        };

        let mut field = |name: &'static str, raw: &Option<String>| -> f64 {
            match parse_number(raw) {
                Ok(value) => value,
                Err(kind) => {
                    parsed.issues.push(DataIssue {
                        date: Some(date.to_string()),
                        field: name,
                        raw: raw.clone(),
                        kind,
                    });
                    0.0
                }
            }
        };

        let open = field("open", &row.open);
        let high = field("high", &row.high);
        let low = field("low", &row.low);
        let close = field("clos", &row.clos);
        let volume = field("tvol", &row.tvol).max(0.0).round() as u64;

        parsed
            .candles
            .push(Candle::new(open, high, low, close, volume, time));
    }

    parsed
}

pub fn parse_quote(raw: &RawQuote) -> Option<Quote> {
    let last = parse_number(&raw.last).ok()?;
    Some(Quote {
        last,
        previous_close: parse_number(&raw.base).unwrap_or(0.0),
        change: parse_number(&raw.diff).unwrap_or(0.0),
        change_rate: parse_number(&raw.rate).unwrap_or(0.0),
        volume: parse_number(&raw.tvol).unwrap_or(0.0).max(0.0).round() as u64,
    })
}

fn parse_number(raw: &Option<String>) -> Result<f64, IssueKind> {
    let text = raw
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(IssueKind::Missing)?;
    text.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(IssueKind::Unparsable)
}
