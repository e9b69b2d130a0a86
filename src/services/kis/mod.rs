//! Korea Investment & Securities (KIS) open API integration

pub mod client;
pub mod error;
pub mod parser;
pub mod rate_limiter;
pub mod token;
pub mod types;

pub use client::KisClient;
pub use error::KisError;
pub use parser::{parse_daily_candles, DataIssue, IssueKind, ParsedCandles};
pub use rate_limiter::RateLimiter;
pub use token::{TokenData, TokenManager, TokenStatus};
pub use types::Quote;
