//! Background eviction of expired rate-limit counters.
//!
//! Keeps the counter map bounded under client churn: a key is only retained
//! while its window is live.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::security::rate_limit::RateLimiter;

pub struct CounterSweeper {
    limiter: RateLimiter,
    interval: Duration,
}

impl CounterSweeper {
    pub fn new(limiter: RateLimiter, interval: Duration) -> Self {
        Self { limiter, interval }
    }

    /// Evict once and publish the resulting key count.
    pub fn sweep(&self) -> usize {
        let removed = self.limiter.evict_expired();
        let remaining = self.limiter.tracked_keys();
        metrics::record_tracked_keys(remaining);
        if removed > 0 {
            tracing::debug!(removed, remaining, "Evicted expired rate-limit counters");
        }
        removed
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Counter sweeper starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Counter sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
