//! Minimum spacing between remote calls.

use log::debug;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Default minimum interval between two calls on one connection (200 ms).
pub const DEFAULT_MIN_CALL_INTERVAL: Duration = Duration::from_millis(200);

/// Spaces calls on one connection at least `min_interval` apart.
///
/// The last-call instant starts at construction time, so the very first call
/// on a fresh connection may also wait. The lock is held across the sleep:
/// concurrent callers queue up and each one is spaced from the previous.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Instant>,
}

impl RateLimiter {
    /// Creates a limiter. A zero interval disables throttling.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(Instant::now()),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until the minimum interval since the previous call has passed,
    /// then records the current instant as the last call.
    ///
    /// # Returns
    ///
    /// The time spent waiting.
    pub async fn throttle(&self) -> Duration {
        let mut last_call = self.last_call.lock().await;

        let since = last_call.elapsed();
        let wait = self.min_interval.saturating_sub(since);
        if !wait.is_zero() {
            debug!(
                "[RATE_LIMIT] Delaying call by {}ms (last call {}ms ago)",
                wait.as_millis(),
                since.as_millis()
            );
            sleep(wait).await;
        }

        *last_call = Instant::now();
        wait
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CALL_INTERVAL)
    }
}
