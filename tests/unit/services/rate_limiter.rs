//! Unit tests for the KIS rate limiter

use std::sync::Arc;
use std::time::Duration;

use stockpulse::services::kis::RateLimiter;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_first_call_does_not_wait() {
    let limiter = RateLimiter::new(Duration::from_millis(500));
    let start = Instant::now();
    limiter.wait().await;
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_calls_are_spaced() {
    let limiter = RateLimiter::new(Duration::from_millis(500));
    let start = Instant::now();

    limiter.wait().await;
    limiter.wait().await;
    limiter.wait().await;

    assert!(start.elapsed() >= Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_queue_up() {
    let limiter = Arc::new(RateLimiter::default());
    assert_eq!(limiter.min_delay(), Duration::from_millis(500));
    let start = Instant::now();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                limiter.wait().await;
                Instant::now()
            })
        })
        .collect();

    let mut finished = Vec::new();
    for handle in handles {
        finished.push(handle.await.unwrap());
    }
    finished.sort();

    assert!(finished[3] - start >= Duration::from_millis(1500));
    for pair in finished.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(500));
    }
}

#[tokio::test(start_paused = true)]
async fn test_no_wait_after_gap_elapsed() {
    let limiter = RateLimiter::new(Duration::from_millis(500));
    limiter.wait().await;
    tokio::time::sleep(Duration::from_millis(600)).await;

    let start = Instant::now();
    limiter.wait().await;
    assert_eq!(start.elapsed(), Duration::ZERO);
}
