//! Individual rule checks. Each is independent; none short-circuits another.

use crate::models::indicators::BollingerBands;
use crate::models::signal::{BollingerStatus, RsiStatus, RuleStatus, Trend};
use crate::signals::policy::SignalPolicy;

pub fn trend(ma20: Option<f64>, ma60: Option<f64>) -> (Trend, RuleStatus) {
    match (ma20, ma60) {
        (Some(short), Some(long)) if short > long => (Trend::Up, RuleStatus::Pass),
        _ => (Trend::Down, RuleStatus::Fail),
    }
}

/// Inside the band passes; a shallower dip is only a warning
pub fn pullback_status(rate: f64, policy: &SignalPolicy) -> RuleStatus {
    if rate < policy.pullback_min {
        RuleStatus::Warning
    } else if rate <= policy.pullback_max {
        RuleStatus::Pass
    } else {
        RuleStatus::Fail
    }
}

pub fn volume_status(ratio: f64, policy: &SignalPolicy) -> RuleStatus {
    RuleStatus::from_pass(ratio < policy.volume_ratio_max)
}

pub fn duration_status(days_since_high: i64, policy: &SignalPolicy) -> RuleStatus {
    RuleStatus::from_pass(
        (policy.duration_min_days..=policy.duration_max_days).contains(&days_since_high),
    )
}

/// A zero low gives no meaningful range, so it never passes
pub fn consolidation_status(rate: f64, min_low: f64, policy: &SignalPolicy) -> RuleStatus {
    RuleStatus::from_pass(min_low > 0.0 && rate <= policy.consolidation_max)
}

pub fn rsi_status(rsi: f64, policy: &SignalPolicy) -> RsiStatus {
    if rsi <= policy.rsi_oversold {
        RsiStatus::Oversold
    } else if rsi >= policy.rsi_overbought {
        RsiStatus::Overbought
    } else {
        RsiStatus::Neutral
    }
}

pub fn bollinger_status(price: f64, bands: Option<&BollingerBands>) -> BollingerStatus {
    match bands {
        None => BollingerStatus::Middle,
        Some(b) if price >= b.upper => BollingerStatus::UpperTouch,
        Some(b) if price <= b.lower => BollingerStatus::LowerTouch,
        Some(b) if price <= b.middle => BollingerStatus::LowerHalf,
        Some(_) => BollingerStatus::UpperHalf,
    }
}

/// `(bullish, turn)`: histogram above zero, and a cross from at-or-below zero on the last step
pub fn macd_momentum(latest: Option<f64>, previous: Option<f64>) -> (bool, bool) {
    match latest {
        Some(h) if h > 0.0 => (true, previous.unwrap_or(0.0) <= 0.0),
        _ => (false, false),
    }
}

pub fn score(statuses: &[RuleStatus]) -> u8 {
    statuses.iter().filter(|s| s.is_pass()).count() as u8
}
