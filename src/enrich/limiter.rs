use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::info;

/// Sliding-window call budget: at most `max_calls` within the trailing `window`.
///
/// Single caller only. `acquire` checks and records in one step, so a
/// limiter shared between tasks needs a mutex around it.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    margin: Duration,
    calls: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, window: Duration, margin: Duration) -> Self {
        RateLimiter {
            max_calls: max_calls.max(1),
            window,
            margin,
            calls: VecDeque::new(),
        }
    }

    pub fn per_minute(max_calls: usize, margin: Duration) -> Self {
        Self::new(max_calls, Duration::from_secs(60), margin)
    }

    /// Wait until a call fits in the window, then record it.
    pub async fn acquire(&mut self) {
        loop {
            let now = Instant::now();
            self.prune(now);
            if self.calls.len() < self.max_calls {
                self.calls.push_back(now);
                return;
            }
            let Some(&oldest) = self.calls.front() else {
                continue;
            };
            let wait = self.window.saturating_sub(now.duration_since(oldest)) + self.margin;
            info!(
                "Classifier budget of {} calls per {}s reached, waiting {:.1}s",
                self.max_calls,
                self.window.as_secs(),
                wait.as_secs_f64()
            );
            sleep(wait).await;
        }
    }

    /// Calls still inside the window.
    #[cfg(test)]
    pub fn in_window(&mut self) -> usize {
        self.prune(Instant::now());
        self.calls.len()
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&front) = self.calls.front() {
            if now.duration_since(front) >= self.window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sixteenth_call_waits_for_oldest_to_expire() {
        let mut limiter = RateLimiter::per_minute(15, Duration::from_millis(100));
        let start = Instant::now();
        for _ in 0..15 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(limiter.in_window(), 15);

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert!(start.elapsed() < Duration::from_secs(61));
        assert_eq!(limiter.in_window(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_calls_do_not_wait() {
        let mut limiter = RateLimiter::per_minute(2, Duration::ZERO);
        let start = Instant::now();
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(30)).await;
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(31)).await;
        // First call is now 61s old and has left the window.
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(62));
        assert_eq!(limiter.in_window(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_is_measured_from_oldest_call() {
        let mut limiter = RateLimiter::per_minute(2, Duration::ZERO);
        let start = Instant::now();
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(20)).await;
        limiter.acquire().await;
        limiter.acquire().await;
        // Released when the call made at t=0 ages out, not the one at t=20.
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert!(start.elapsed() < Duration::from_secs(61));
    }
}
