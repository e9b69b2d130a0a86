//! Backlog that backfills newly added tickers one at a time

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use tracing::{error, info};

use crate::jobs::context::JobContext;
use crate::jobs::handlers::init_ticker;
use crate::models::ticker::Exchange;

#[derive(Debug, Clone)]
struct QueueItem {
    symbol: String,
    exchange: Exchange,
    added_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<QueueItem>,
    is_processing: bool,
    current_symbol: Option<String>,
    processed: u64,
    failed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub queue_length: usize,
    pub is_processing: bool,
    pub current_symbol: Option<String>,
    pub processed: u64,
    pub failed: u64,
}

/// FIFO of symbols awaiting a year of history.
///
/// A single spawned task drains the queue, so entries are processed strictly
/// in insertion order and never concurrently.
pub struct TickerInitQueue {
    ctx: Arc<JobContext>,
    state: Mutex<QueueState>,
    idle: Notify,
}

impl TickerInitQueue {
    pub fn new(ctx: Arc<JobContext>) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            state: Mutex::new(QueueState::default()),
            idle: Notify::new(),
        })
    }

    /// Enqueue a symbol; returns `false` if it is already pending
    pub async fn add(self: &Arc<Self>, symbol: &str, exchange: Exchange) -> bool {
        let mut state = self.state.lock().await;

        if state.pending.iter().any(|item| item.symbol == symbol) {
            info!(symbol = %symbol, "{} is already queued", symbol);
            return false;
        }

        state.pending.push_back(QueueItem {
            symbol: symbol.to_string(),
            exchange,
            added_at: Utc::now(),
        });
        info!(
            symbol = %symbol,
            queue_length = state.pending.len(),
            "Queued {} for backfill",
            symbol
        );

        if !state.is_processing {
            state.is_processing = true;
            let queue = Arc::clone(self);
            tokio::spawn(async move { queue.drain().await });
        }
        true
    }

    pub async fn status(&self) -> QueueStatus {
        let state = self.state.lock().await;
        QueueStatus {
            queue_length: state.pending.len(),
            is_processing: state.is_processing,
            current_symbol: state.current_symbol.clone(),
            processed: state.processed,
            failed: state.failed,
        }
    }

    /// Drop pending entries; the one in progress finishes
    pub async fn clear(&self) {
        self.state.lock().await.pending.clear();
        info!("Backfill queue cleared");
    }

    pub async fn reset_stats(&self) {
        let mut state = self.state.lock().await;
        state.processed = 0;
        state.failed = 0;
        info!("Backfill queue stats reset");
    }

    /// Resolves once nothing is pending or in progress
    pub async fn wait_until_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = self.state.lock().await;
                if !state.is_processing && state.pending.is_empty() {
                    return;
                }
            }
            notified.await;
        }
    }

    async fn drain(&self) {
        loop {
            let item = {
                let mut state = self.state.lock().await;
                match state.pending.pop_front() {
                    Some(item) => {
                        state.current_symbol = Some(item.symbol.clone());
                        item
                    }
                    None => {
                        state.is_processing = false;
                        state.current_symbol = None;
                        info!(
                            processed = state.processed,
                            failed = state.failed,
                            "Backfill queue drained"
                        );
                        break;
                    }
                }
            };

            let waited_ms = (Utc::now() - item.added_at).num_milliseconds();
            info!(symbol = %item.symbol, waited_ms = waited_ms, "Backfilling {}", item.symbol);

            let result = init_ticker(&self.ctx, &item.symbol, item.exchange).await;

            let mut state = self.state.lock().await;
            match result {
                Ok(_) => state.processed += 1,
                Err(e) => {
                    state.failed += 1;
                    self.ctx.record_failure("init");
                    error!(symbol = %item.symbol, error = %e, "Backfill failed for {}", item.symbol);
                }
            }
            state.current_symbol = None;
        }

        self.idle.notify_waiters();
    }
}
