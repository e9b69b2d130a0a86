//! External collaborators: candle source and notifications.

pub mod kis;
pub mod market_data;
pub mod notifier;

pub use market_data::{CandleSource, SourceError};
pub use notifier::{LogNotifier, Notifier, WebhookNotifier};
