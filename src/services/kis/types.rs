//! Wire types for the KIS overseas-price endpoints

use serde::{Deserialize, Serialize};

/// One daily bar as KIS sends it: every field a string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDailyCandle {
    pub xymd: Option<String>,
    pub xhms: Option<String>,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub clos: Option<String>,
    pub tvol: Option<String>,
}

/// Common response envelope; `rt_cd` is "0" on success
#[derive(Debug, Clone, Deserialize)]
pub struct KisResponse<T1, T2> {
    #[serde(default)]
    pub rt_cd: String,
    #[serde(default)]
    pub msg_cd: String,
    #[serde(default)]
    pub msg1: String,
    pub output: Option<T1>,
    pub output2: Option<T2>,
}

impl<T1, T2> KisResponse<T1, T2> {
    pub fn is_success(&self) -> bool {
        self.rt_cd == "0"
    }
}

pub type DailyPriceResponse = KisResponse<serde_json::Value, Vec<RawDailyCandle>>;

/// Latest quote fields from the price endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQuote {
    pub last: Option<String>,
    pub base: Option<String>,
    pub diff: Option<String>,
    pub rate: Option<String>,
    pub tvol: Option<String>,
}

pub type PriceResponse = KisResponse<RawQuote, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quote {
    pub last: f64,
    pub previous_close: f64,
    pub change: f64,
    pub change_rate: f64,
    pub volume: u64,
}

#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub grant_type: &'a str,
    pub appkey: &'a str,
    pub appsecret: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub access_token_token_expired: String,
}
