//! Shared data models spanning the engine layers.

pub mod indicators;
pub mod signal;
pub mod ticker;

pub use indicators::{
    BollingerBands, BollingerPoint, Candle, IndicatorPoint, IndicatorSet, MacdPoint,
};
pub use signal::{
    BollingerStatus, RsiStatus, RuleStatus, SignalAnalysis, TickerSignalRecord, Trend,
};
pub use ticker::{normalize_symbol, CandleInterval, Exchange, ManagedTicker};
