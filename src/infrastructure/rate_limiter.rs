//! Sliding-window request rate limiter
//!
//! Admits at most `max_requests` acquisitions inside any trailing `window`.
//! Timestamps are recorded before the caller proceeds, so concurrent callers
//! never observe a stale count.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::debug;

pub const DEFAULT_MAX_REQUESTS: usize = 5;
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Cloning shares the underlying window.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        let config = RateLimiterConfig {
            max_requests: config.max_requests.max(1),
            window: config.window,
        };
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::with_capacity(config.max_requests))),
            config,
        }
    }

    pub const fn config(&self) -> RateLimiterConfig {
        self.config
    }

    /// Wait until a slot is free inside the trailing window, then claim it.
    pub async fn acquire(&self) {
        loop {
            let wake_at = {
                let mut timestamps = self.lock();
                let now = Instant::now();
                Self::prune(&mut timestamps, now, self.config.window);

                if timestamps.len() < self.config.max_requests {
                    timestamps.push_back(now);
                    return;
                }

                // Oldest timestamp leaves the window at this instant
                timestamps
                    .front()
                    .map_or(now, |oldest| *oldest + self.config.window)
            };

            debug!(
                "Rate limit reached ({} per {:?}), waiting {:?}",
                self.config.max_requests,
                self.config.window,
                wake_at.saturating_duration_since(Instant::now())
            );
            sleep_until(wake_at).await;
        }
    }

    /// Acquire a slot, then run the operation.
    pub async fn execute_with_limit<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.acquire().await;
        operation().await
    }

    /// Number of acquisitions currently inside the window.
    pub fn in_flight_window(&self) -> usize {
        let mut timestamps = self.lock();
        Self::prune(&mut timestamps, Instant::now(), self.config.window);
        timestamps.len()
    }

    fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(oldest) = timestamps.front() {
            if now.saturating_duration_since(*oldest) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        self.timestamps
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;

    fn limiter(max_requests: usize, window_ms: u64) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_requests,
            window: Duration::from_millis(window_ms),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_limit_immediately() {
        let limiter = limiter(5, 1000);
        let start = Instant::now();

        for _ in 0..5 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.in_flight_window(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn sixth_request_waits_for_window() {
        let limiter = limiter(5, 1000);
        let start = Instant::now();

        for _ in 0..6 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert!(start.elapsed() < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_never_exceed_window() {
        let limiter = limiter(2, 500);
        let start = Instant::now();

        let admitted = join_all((0..6).map(|i| {
            let limiter = limiter.clone();
            async move {
                limiter.execute_with_limit(|| async move { (i, Instant::now()) }).await
            }
        }))
        .await;

        let mut instants: Vec<Instant> = admitted.into_iter().map(|(_, at)| at).collect();
        instants.sort();
        for pair in instants.windows(3) {
            assert!(pair[2].duration_since(pair[0]) >= Duration::from_millis(500));
        }
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn slots_free_up_after_window_passes() {
        let limiter = limiter(1, 200);
        limiter.acquire().await;
        tokio::time::advance(Duration::from_millis(250)).await;

        assert_eq!(limiter.in_flight_window(), 0);
    }

    #[test]
    fn zero_limit_is_clamped_to_one() {
        assert_eq!(limiter(0, 100).config().max_requests, 1);
    }
}
