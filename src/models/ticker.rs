//! Watchlist entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// US exchange codes understood by the brokerage API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    #[default]
    Nas,
    Nys,
    Ams,
}

impl Exchange {
    pub fn code(self) -> &'static str {
        match self {
            Exchange::Nas => "NAS",
            Exchange::Nys => "NYS",
            Exchange::Ams => "AMS",
        }
    }
}

impl FromStr for Exchange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NAS" => Ok(Exchange::Nas),
            "NYS" => Ok(Exchange::Nys),
            "AMS" => Ok(Exchange::Ams),
            other => Err(format!("unknown exchange: {}", other)),
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Candle interval stored alongside each row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleInterval {
    Daily,
}

impl CandleInterval {
    pub fn as_str(self) -> &'static str {
        match self {
            CandleInterval::Daily => "daily",
        }
    }
}

/// A symbol on the managed watchlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedTicker {
    pub id: Option<i32>,
    pub symbol: String,
    pub name: Option<String>,
    pub exchange: Exchange,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_collected_at: Option<DateTime<Utc>>,
}

impl ManagedTicker {
    pub fn new(symbol: &str, name: Option<String>, exchange: Exchange) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            symbol: normalize_symbol(symbol),
            name,
            exchange,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_collected_at: None,
        }
    }
}

/// Symbols are stored upper-case with surrounding whitespace removed
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
