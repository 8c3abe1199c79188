use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};

/// Sliding-window limiter: at most `max_requests` requests start within any `window`
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    started: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            started: VecDeque::new(),
        }
    }

    pub async fn wait(&mut self) {
        self.evict_expired(Instant::now());

        if self.is_saturated() {
            self.wait_for_slot().await;
        }
        self.started.push_back(Instant::now());
    }

    fn is_saturated(&self) -> bool {
        self.started.len() >= self.max_requests
    }

    async fn wait_for_slot(&mut self) {
        if let Some(oldest) = self.started.front().copied() {
            log::debug!("Rate limit reached, waiting for a free slot");
            sleep_until(oldest + self.window).await;
        }
        self.evict_expired(Instant::now());
    }

    fn evict_expired(&mut self, now: Instant) {
        while let Some(oldest) = self.started.front() {
            if now.duration_since(*oldest) < self.window {
                break;
            }
            self.started.pop_front();
        }
    }
}

#[cfg(test)]
impl RateLimiter {
    fn in_window(&self) -> usize {
        self.started.len()
    }
}
