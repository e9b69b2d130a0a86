//! Collection and classification jobs

pub mod context;
pub mod handlers;
pub mod pipeline;
pub mod ticker_queue;
pub mod types;

pub use context::JobContext;
pub use pipeline::{PipelineStatus, SignalPipeline};
pub use ticker_queue::{QueueStatus, TickerInitQueue};
pub use types::{AnalyzeReport, CollectReport, DailyReport, RunOutcome};
