//! Inter-request pacing: a minimum-interval gate.
//!
//! The archive server is the shared resource and sequential pacing is the
//! only backpressure mechanism in the run. The contract is "no more than
//! one request per configured interval"; the delay computation is pure so
//! it can be tested without wall-clock sleeps.

use std::time::{Duration, Instant};

/// Gate that spaces consecutive requests at least `min_interval` apart.
#[derive(Debug)]
pub struct Pacer {
    min_interval: Duration,
    last_start: Option<Instant>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Pacer {
            min_interval,
            last_start: None,
        }
    }

    /// Delay required before the next request may start at `now`.
    /// The first request is never delayed.
    pub fn delay_until_ready(&self, now: Instant) -> Duration {
        match self.last_start {
            None => Duration::ZERO,
            Some(last) => self.min_interval.saturating_sub(now.duration_since(last)),
        }
    }

    /// Record that a request started at `now`.
    pub fn mark_started(&mut self, now: Instant) {
        self.last_start = Some(now);
    }

    /// Sleep out the remaining interval, then mark the next request started.
    pub async fn pace(&mut self) {
        let wait = self.delay_until_ready(Instant::now());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        self.mark_started(Instant::now());
    }
}
