//! Service surfaces: the HTTP API, the cron scheduler and process wiring

pub mod bootstrap;
pub mod http;
pub mod scheduler;

pub use bootstrap::*;
pub use http::*;
pub use scheduler::*;
