//! Integration tests for the backfill queue

use std::sync::Arc;

use stockpulse::jobs::TickerInitQueue;
use stockpulse::models::ticker::Exchange;
use tokio::sync::Semaphore;

use crate::test_utils::{flat_history, wait_for, FakeCandleSource, TestContext};

#[tokio::test]
async fn processes_symbols_in_insertion_order() {
    let source = FakeCandleSource::new()
        .with_candles("AAPL", flat_history(400))
        .with_candles("MSFT", flat_history(100))
        .with_candles("NVDA", flat_history(70));
    let env = TestContext::new(source);
    let queue = TickerInitQueue::new(env.ctx.clone());

    assert!(queue.add("AAPL", Exchange::Nas).await);
    assert!(queue.add("MSFT", Exchange::Nas).await);
    assert!(queue.add("NVDA", Exchange::Nas).await);
    queue.wait_until_idle().await;

    assert_eq!(env.source.calls(), vec!["AAPL", "MSFT", "NVDA"]);
    assert_eq!(env.storage.candle_count("AAPL").await, 365);
    assert_eq!(env.storage.candle_count("MSFT").await, 100);

    let status = queue.status().await;
    assert_eq!(status.processed, 3);
    assert_eq!(status.failed, 0);
    assert_eq!(status.queue_length, 0);
    assert!(!status.is_processing);
    assert!(status.current_symbol.is_none());
}

#[tokio::test]
async fn pending_duplicates_are_ignored() {
    let gate = Arc::new(Semaphore::new(0));
    let source = FakeCandleSource::new()
        .with_candles("AAPL", flat_history(70))
        .with_candles("MSFT", flat_history(70))
        .gated(gate.clone());
    let env = TestContext::new(source);
    let queue = TickerInitQueue::new(env.ctx.clone());

    assert!(queue.add("AAPL", Exchange::Nas).await);
    let source = env.source.clone();
    wait_for(|| !source.calls().is_empty()).await;

    assert!(queue.add("MSFT", Exchange::Nys).await);
    assert!(!queue.add("MSFT", Exchange::Nys).await);

    let status = queue.status().await;
    assert_eq!(status.queue_length, 1);
    assert!(status.is_processing);
    assert_eq!(status.current_symbol.as_deref(), Some("AAPL"));

    gate.add_permits(10);
    queue.wait_until_idle().await;
    assert_eq!(env.source.calls(), vec!["AAPL", "MSFT"]);
    assert_eq!(queue.status().await.processed, 2);
}

#[tokio::test]
async fn failures_and_empty_replies_are_counted() {
    let source = FakeCandleSource::new()
        .with_candles("AAPL", flat_history(70))
        .failing("TSLA");
    let env = TestContext::new(source);
    let queue = TickerInitQueue::new(env.ctx.clone());

    queue.add("TSLA", Exchange::Nas).await;
    queue.add("EMPTY", Exchange::Nas).await;
    queue.add("AAPL", Exchange::Nas).await;
    queue.wait_until_idle().await;

    let status = queue.status().await;
    assert_eq!(status.processed, 1);
    assert_eq!(status.failed, 2);
    assert_eq!(
        env.metrics
            .pipeline_failures_total
            .with_label_values(&["init"])
            .get(),
        2
    );

    queue.reset_stats().await;
    let status = queue.status().await;
    assert_eq!((status.processed, status.failed), (0, 0));
}

#[tokio::test]
async fn clear_drops_pending_entries() {
    let gate = Arc::new(Semaphore::new(0));
    let source = FakeCandleSource::new()
        .with_candles("AAPL", flat_history(70))
        .gated(gate.clone());
    let env = TestContext::new(source);
    let queue = TickerInitQueue::new(env.ctx.clone());

    queue.add("AAPL", Exchange::Nas).await;
    let source = env.source.clone();
    wait_for(|| !source.calls().is_empty()).await;
    queue.add("MSFT", Exchange::Nas).await;
    queue.add("NVDA", Exchange::Nas).await;

    queue.clear().await;
    assert_eq!(queue.status().await.queue_length, 0);

    gate.add_permits(10);
    queue.wait_until_idle().await;
    assert_eq!(env.source.calls(), vec!["AAPL"]);
    assert_eq!(queue.status().await.processed, 1);
}
