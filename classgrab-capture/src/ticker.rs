use async_trait::async_trait;
use std::time::Duration;

/// Suspension point of the waiting loop.
///
/// Tests substitute an implementation that returns immediately and records
/// how often the loop slept.
#[async_trait]
pub trait Ticker: Send + Sync {
    async fn sleep(&self, interval: Duration);
}

/// Wall-clock ticker backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTicker;

#[async_trait]
impl Ticker for TokioTicker {
    async fn sleep(&self, interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}
