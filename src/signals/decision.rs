//! Decision cascade mapping rule outcomes to a signal level

use serde::{Deserialize, Serialize};

use crate::models::signal::{BollingerStatus, RuleStatus};
use crate::signals::policy::SignalPolicy;

/// Every branch the cascade can end in, each with one fixed keyword and message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    ReboundAttempt,
    VeryDangerous,
    Overheated,
    StrongBuy,
    Buy,
    BuyLowerHalf,
    Hold,
    ScoreOverride,
}

impl Verdict {
    pub fn level(self) -> u8 {
        match self {
            Verdict::VeryDangerous => 1,
            Verdict::ReboundAttempt | Verdict::Overheated => 2,
            Verdict::Hold => 3,
            Verdict::Buy | Verdict::BuyLowerHalf | Verdict::ScoreOverride => 4,
            Verdict::StrongBuy => 5,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Verdict::ReboundAttempt => "주의 (반등시도)",
            Verdict::VeryDangerous => "매우 위험",
            Verdict::Overheated => "주의 (과열)",
            Verdict::StrongBuy => "적극 매수",
            Verdict::Buy | Verdict::BuyLowerHalf | Verdict::ScoreOverride => "매수",
            Verdict::Hold => "관망 (보유)",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Verdict::ReboundAttempt => {
                "하락 추세지만 반등 가능성이 있습니다. 섣불리 진입하지 말고 지켜보세요."
            }
            Verdict::VeryDangerous => {
                "하락 추세입니다. 보유하고 있다면 매도를 고려하고, 신규 진입은 위험합니다."
            }
            Verdict::Overheated => {
                "상승 추세지만 단기 과열(너무 비쌈) 상태입니다. 조정이 올 수 있으니 주의하세요."
            }
            Verdict::StrongBuy => {
                "상승 추세 속 확실한 저점 매수 기회입니다! (눌림목 + 모멘텀 살아있음)"
            }
            Verdict::Buy => "상승 추세 중 가격이 매력적인 구간입니다. 분할 매수로 접근해보세요.",
            Verdict::BuyLowerHalf => {
                "상승 흐름이 견조하며 가격 부담이 적습니다. 매수하기 좋은 구간입니다."
            }
            Verdict::Hold => {
                "상승세가 유지되고 있으나, 현재 진입하기엔 가격 메리트가 적습니다. 보유자는 홀딩하세요."
            }
            Verdict::ScoreOverride => "기술적 지표들이 전반적으로 긍정적입니다. 매수를 고려해보세요.",
        }
    }
}

/// Inputs the cascade reads
#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs {
    pub trend_status: RuleStatus,
    pub pullback_status: RuleStatus,
    pub volume_status: RuleStatus,
    pub rsi: f64,
    pub macd_bullish: bool,
    pub macd_turn: bool,
    pub bb_status: BollingerStatus,
    pub score: u8,
}

/// Top-down cascade, first match wins
pub fn primary_verdict(inputs: &DecisionInputs, policy: &SignalPolicy) -> Verdict {
    if inputs.trend_status != RuleStatus::Pass {
        return if inputs.macd_turn || inputs.rsi < policy.rsi_oversold {
            Verdict::ReboundAttempt
        } else {
            Verdict::VeryDangerous
        };
    }

    if inputs.rsi >= policy.rsi_overbought || inputs.bb_status == BollingerStatus::UpperTouch {
        Verdict::Overheated
    } else if inputs.rsi <= policy.rsi_rebuy
        || inputs.bb_status == BollingerStatus::LowerTouch
        || inputs.pullback_status.is_pass()
    {
        if inputs.macd_bullish || inputs.volume_status.is_pass() {
            Verdict::StrongBuy
        } else {
            Verdict::Buy
        }
    } else if inputs.bb_status == BollingerStatus::LowerHalf {
        Verdict::BuyLowerHalf
    } else {
        Verdict::Hold
    }
}

/// Cascade plus the score override, which may lift even a downtrend verdict
pub fn decide(inputs: &DecisionInputs, policy: &SignalPolicy) -> Verdict {
    let verdict = primary_verdict(inputs, policy);
    if inputs.score >= policy.override_score && verdict.level() < Verdict::ScoreOverride.level() {
        Verdict::ScoreOverride
    } else {
        verdict
    }
}
