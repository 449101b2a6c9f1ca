//! Background removal of stale rate-limit records.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, info};

use crate::metrics;
use crate::rate_limit::FixedWindowLimiter;

/// Periodically sweeps every registered limiter.
pub struct LimiterSweeper {
    limiters: Vec<Arc<FixedWindowLimiter>>,
    every: Duration,
}

impl LimiterSweeper {
    pub fn new(limiters: Vec<Arc<FixedWindowLimiter>>, every: Duration) -> Self {
        Self { limiters, every }
    }

    /// Start the sweep loop.
    ///
    /// This function runs indefinitely and should be spawned as a background task.
    pub async fn run(&self) {
        info!("Starting rate limit sweeper (interval: {:?})", self.every);

        let mut ticker = interval(self.every);
        loop {
            ticker.tick().await;
            self.sweep_once();
        }
    }

    /// Run a single sweep over all limiters; returns the number of records removed.
    pub fn sweep_once(&self) -> usize {
        self.limiters
            .iter()
            .map(|limiter| {
                let removed = limiter.sweep();
                let tracked = limiter.tracked();
                metrics::record_rate_limit_sweep(limiter.name(), removed, tracked);
                if removed > 0 {
                    debug!(limiter = limiter.name(), removed, tracked, "Swept stale rate limit records");
                }
                removed
            })
            .sum()
    }
}
