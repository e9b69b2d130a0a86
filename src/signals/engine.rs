//! Signal classifier: candles in, one `SignalAnalysis` out.

use tracing::debug;

use crate::common::math;
use crate::indicators::{calculate_all, rsi_at};
use crate::models::indicators::Candle;
use crate::models::signal::SignalAnalysis;
use crate::signals::decision::{decide, DecisionInputs};
use crate::signals::policy::SignalPolicy;
use crate::signals::rules;

pub const MIN_CANDLES: usize = 60;
pub const MAX_WINDOW: usize = 365;

const HIGH_2W_WINDOW: usize = 14;
const CONSOLIDATION_WINDOW: usize = 5;
const NEUTRAL_RSI: f64 = 50.0;

/// Stateless classifier bound to one threshold policy
#[derive(Debug, Clone, Default)]
pub struct SignalAnalyzer {
    policy: SignalPolicy,
}

impl SignalAnalyzer {
    pub fn new(policy: SignalPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SignalPolicy {
        &self.policy
    }

    /// Classify a ticker from its candle history.
    ///
    /// Candles may come in any order; the newest `max_window` are used.
    /// Returns `None` when fewer than `min_candles` are available.
    pub fn analyze(&self, candles: &[Candle]) -> Option<SignalAnalysis> {
        let policy = &self.policy;

        let mut recent_first = candles.to_vec();
        recent_first.sort_by(|a, b| b.time.cmp(&a.time));
        recent_first.truncate(policy.max_window);

        if recent_first.len() < policy.min_candles {
            debug!(
                candles = recent_first.len(),
                required = policy.min_candles,
                "Not enough candles to classify"
            );
            return None;
        }

        let latest = &recent_first[0];
        let current_price = latest.close;
        let closes: Vec<f64> = recent_first.iter().map(|c| c.close).collect();

        let ma20 = window_mean(&closes, 20);
        let ma60 = window_mean(&closes, 60);
        let high_52w = math::max(recent_first.iter().map(|c| c.high)).unwrap_or(0.0);

        let (high_2w, high_2w_date) = recent_first
            .iter()
            .take(HIGH_2W_WINDOW)
            .fold((0.0, None), |(best, date), c| {
                if c.high > best {
                    (c.high, Some(c.time))
                } else {
                    (best, date)
                }
            });

        let volumes: Vec<f64> = recent_first.iter().map(|c| c.volume as f64).collect();
        let avg_volume_5 = window_mean(&volumes, 5).unwrap_or(0.0);
        let avg_volume_20 = window_mean(&volumes, 20).unwrap_or(0.0);
        let volume_ratio = if avg_volume_20 > 0.0 {
            avg_volume_5 / avg_volume_20
        } else {
            0.0
        };

        let pullback_rate = math::percent_of(high_2w - current_price, high_2w);
        let days_since_high = high_2w_date
            .map(|date| (latest.time - date).num_days())
            .unwrap_or(0);

        let last_five = &recent_first[..CONSOLIDATION_WINDOW.min(recent_first.len())];
        let range_high = math::max(last_five.iter().map(|c| c.high)).unwrap_or(0.0);
        let range_low = math::min(last_five.iter().map(|c| c.low)).unwrap_or(0.0);
        let consolidation_rate = math::percent_of(range_high - range_low, range_low);

        let ascending: Vec<Candle> = recent_first.iter().rev().cloned().collect();
        let indicators = calculate_all(&ascending);
        // An RSI of exactly 0 reads as neutral, same as a missing value
        let rsi = rsi_at(&indicators.rsi, latest.time)
            .filter(|v| *v != 0.0)
            .unwrap_or(NEUTRAL_RSI);

        let (trend, trend_status) = rules::trend(ma20, ma60);
        let pullback_status = rules::pullback_status(pullback_rate, policy);
        let volume_status = rules::volume_status(volume_ratio, policy);
        let duration_status = rules::duration_status(days_since_high, policy);
        let consolidation_status =
            rules::consolidation_status(consolidation_rate, range_low, policy);
        let score = rules::score(&[
            trend_status,
            pullback_status,
            volume_status,
            duration_status,
            consolidation_status,
        ]);

        let (macd_bullish, macd_turn) = rules::macd_momentum(
            indicators.latest_macd().and_then(|p| p.histogram),
            indicators.previous_macd().and_then(|p| p.histogram),
        );
        let bb_status = rules::bollinger_status(
            current_price,
            indicators.latest_bollinger().and_then(|p| p.bands.as_ref()),
        );

        let verdict = decide(
            &DecisionInputs {
                trend_status,
                pullback_status,
                volume_status,
                rsi,
                macd_bullish,
                macd_turn,
                bb_status,
                score,
            },
            policy,
        );

        Some(SignalAnalysis {
            signal_level: verdict.level(),
            signal_keyword: verdict.keyword().to_string(),
            signal_message: verdict.message().to_string(),
            policy: policy.name().to_string(),
            ma20,
            ma60,
            trend,
            trend_status,
            rsi,
            rsi_status: rules::rsi_status(rsi, policy),
            pullback_rate,
            pullback_status,
            volume_ratio,
            volume_status,
            days_since_high,
            duration_status,
            consolidation_rate,
            consolidation_status,
            macd_bullish,
            macd_turn,
            bb_status,
            current_price,
            high_2w,
            high_2w_date,
            high_52w,
            as_of: latest.time,
            score,
        })
    }
}

/// Classify with the default policy
pub fn analyze_signal(candles: &[Candle]) -> Option<SignalAnalysis> {
    SignalAnalyzer::default().analyze(candles)
}

/// Mean of the first `len` values, only when exactly that many exist
fn window_mean(recent_first: &[f64], len: usize) -> Option<f64> {
    recent_first.get(..len).and_then(math::mean)
}
