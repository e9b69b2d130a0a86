//! Rule-based signal classification.

pub mod decision;
pub mod engine;
pub mod policy;
pub mod rules;

pub use decision::{decide, primary_verdict, DecisionInputs, Verdict};
pub use engine::{analyze_signal, SignalAnalyzer, MAX_WINDOW, MIN_CANDLES};
pub use policy::{PolicyPreset, SignalPolicy};
