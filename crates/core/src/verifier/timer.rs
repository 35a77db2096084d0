//! Clock and wait primitive used between polls.

use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Time source for the poll loop, injectable so tests need not sleep.
#[async_trait]
pub trait PollTimer: Send + Sync {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Wait for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock timer backed by the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[async_trait]
impl PollTimer for TokioTimer {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
