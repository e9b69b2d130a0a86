//! Threshold sets for the signal classifier

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::signals::engine::{MAX_WINDOW, MIN_CANDLES};

/// Named threshold presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyPreset {
    /// Deep pullback entries, used for the stored daily signal
    #[default]
    Swing,
    /// Shallow pullback entries
    ShortTerm,
}

impl PolicyPreset {
    pub fn name(self) -> &'static str {
        match self {
            PolicyPreset::Swing => "swing",
            PolicyPreset::ShortTerm => "short_term",
        }
    }

    pub fn policy(self) -> SignalPolicy {
        match self {
            PolicyPreset::Swing => SignalPolicy::swing(),
            PolicyPreset::ShortTerm => SignalPolicy::short_term(),
        }
    }
}

impl FromStr for PolicyPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "swing" => Ok(PolicyPreset::Swing),
            "short_term" | "shortterm" => Ok(PolicyPreset::ShortTerm),
            other => Err(format!("unknown signal policy: {}", other)),
        }
    }
}

impl fmt::Display for PolicyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every threshold used by the rules and the decision cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPolicy {
    pub preset: PolicyPreset,
    /// Inclusive pullback band (percent) that passes
    pub pullback_min: f64,
    pub pullback_max: f64,
    /// 5-day / 20-day volume ratio must stay below this
    pub volume_ratio_max: f64,
    /// Inclusive window of days since the two-week high
    pub duration_min_days: i64,
    pub duration_max_days: i64,
    /// Maximum 5-day range as percent of the low
    pub consolidation_max: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// RSI at or below this counts as a dip worth buying in an uptrend
    pub rsi_rebuy: f64,
    /// Scores at or above this lift weaker verdicts to a buy
    pub override_score: u8,
    pub min_candles: usize,
    pub max_window: usize,
}

impl SignalPolicy {
    pub fn swing() -> Self {
        Self {
            preset: PolicyPreset::Swing,
            pullback_min: 15.0,
            pullback_max: 30.0,
            volume_ratio_max: 1.0,
            duration_min_days: 2,
            duration_max_days: 10,
            consolidation_max: 4.0,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_rebuy: 40.0,
            override_score: 4,
            min_candles: MIN_CANDLES,
            max_window: MAX_WINDOW,
        }
    }

    pub fn short_term() -> Self {
        Self {
            preset: PolicyPreset::ShortTerm,
            pullback_min: 5.0,
            pullback_max: 15.0,
            ..Self::swing()
        }
    }

    pub fn name(&self) -> &'static str {
        self.preset.name()
    }
}

impl Default for SignalPolicy {
    fn default() -> Self {
        PolicyPreset::default().policy()
    }
}
