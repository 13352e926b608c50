//! Request spacing for detail page fetches
//!
//! Consecutive fetches are spaced by at least the configured interval. The
//! limiter itself is stateless: callers keep the timestamp of the last
//! request and hand it back on every turn.

use std::time::Duration;
use tokio::time::Instant;

/// Enforces a minimum interval between outbound requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiter {
    interval: Duration,
}

impl RateLimiter {
    /// Creates a limiter with the given minimum interval
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Creates a limiter from a number of seconds
    ///
    /// Zero, negative and non-finite values disable waiting entirely.
    pub fn from_secs_f64(seconds: f64) -> Self {
        let interval = if seconds.is_finite() && seconds > 0.0 {
            Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        };
        Self::new(interval)
    }

    /// A limiter that never waits
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns the configured interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true if the limiter never waits
    pub fn is_disabled(&self) -> bool {
        self.interval.is_zero()
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(
        &self,
        last_request_time: Option<Instant>,
        now: Instant,
    ) -> Option<Duration> {
        let last = last_request_time?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.interval {
            Some(self.interval - elapsed)
        } else {
            None
        }
    }

    /// Waits until a request may be made and returns the new request time
    ///
    /// With no prior request the current time is returned immediately.
    pub async fn wait_turn(&self, last_request_time: Option<Instant>) -> Instant {
        let now = Instant::now();

        match self.time_until_next_request(last_request_time, now) {
            Some(wait) => {
                tracing::debug!("Rate limit: waiting {:?} before next request", wait);
                tokio::time::sleep(wait).await;
                Instant::now()
            }
            None => now,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::disabled()
    }
}
