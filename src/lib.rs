//! stockpulse: daily candle ingestion and rule-based buy/hold/avoid signals for a
//! watchlist of US equities.

pub mod common;
pub mod config;
pub mod core;
pub mod db;
pub mod indicators;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod signals;
