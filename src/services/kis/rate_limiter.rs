//! Minimum-gap gate for outbound KIS calls

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::trace;

/// Serialises callers so consecutive requests start at least `min_delay` apart.
///
/// The lock is held across the sleep, so waiting callers queue up behind it.
pub struct RateLimiter {
    min_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_delay {
                let remaining = self.min_delay - elapsed;
                trace!(wait_ms = remaining.as_millis() as u64, "Rate limiting KIS request");
                sleep(remaining).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_RATE_LIMIT_MS))
    }
}
