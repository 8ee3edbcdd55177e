//! Retry with exponential backoff for board listings.
//!
//! [`RetryListing`] decorates any [`BoardSource`] so a transient failure
//! (timeout, connection error, 429, 5xx) is retried a fixed number of times
//! before the board is given up on. Anything else, such as a 404 for a banned
//! board or a body that is not a listing, fails on the first attempt.
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use crate::boards::BoardSource;
use crate::error::DeliveryError;
use crate::models::Post;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Wrapper that adds exponential backoff retry logic to a [`BoardSource`].
pub struct RetryListing<T> {
    inner: T,
    /// Retries after the first attempt.
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
    max_jitter_ms: u64,
}

impl<T> RetryListing<T>
where
    T: BoardSource,
{
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(10),
            max_jitter_ms: 250,
        }
    }

    /// Drop the random jitter, making delays deterministic.
    #[cfg(test)]
    pub fn without_jitter(mut self) -> Self {
        self.max_jitter_ms = 0;
        self
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms = match self.max_jitter_ms {
            0 => 0,
            max => rng().random_range(0..=max),
        };
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryListing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryListing")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> BoardSource for RetryListing<T>
where
    T: BoardSource,
{
    #[instrument(level = "debug", skip(self))]
    async fn top_of_day(&self, board: &str, limit: usize) -> Result<Vec<Post>, DeliveryError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.top_of_day(board, limit).await {
                Ok(posts) => return Ok(posts),
                Err(e) if !e.is_transient() => {
                    error!(error = %e, "listing failed; not retrying");
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "listing exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "listing attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boards::tests::post;
    use std::cell::Cell;

    /// Fails the first `failures` calls with `status`, then succeeds.
    #[derive(Debug)]
    struct Flaky {
        failures: usize,
        status: Option<u16>,
        calls: Cell<usize>,
    }

    impl BoardSource for Flaky {
        async fn top_of_day(&self, board: &str, _limit: usize) -> Result<Vec<Post>, DeliveryError> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            if n <= self.failures {
                Err(DeliveryError::Listing {
                    board: board.to_string(),
                    status: self.status,
                    reason: format!("attempt {n} failed"),
                })
            } else {
                Ok(vec![post(board, "https://i.imgur.com/a.jpg", 1)])
            }
        }
    }

    fn flaky(failures: usize) -> Flaky {
        failing_with(failures, Some(503))
    }

    fn failing_with(failures: usize, status: Option<u16>) -> Flaky {
        Flaky {
            failures,
            status,
            calls: Cell::new(0),
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_failures() {
        let source = RetryListing::new(flaky(2), 3, Duration::from_millis(10)).without_jitter();
        let posts = source.top_of_day("aww", 10).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(source.inner.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let source = RetryListing::new(flaky(10), 2, Duration::from_millis(10)).without_jitter();
        let err = source.top_of_day("aww", 10).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Listing { .. }));
        assert_eq!(source.inner.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_no_retry_on_success() {
        let source = RetryListing::new(flaky(0), 3, Duration::from_secs(60));
        source.top_of_day("aww", 10).await.unwrap();
        assert_eq!(source.inner.calls.get(), 1);
    }

    #[tokio::test]
    async fn test_timeouts_and_rate_limits_are_retried() {
        for status in [None, Some(429)] {
            let source =
                RetryListing::new(failing_with(1, status), 3, Duration::from_millis(10)).without_jitter();
            source.top_of_day("aww", 10).await.unwrap();
            assert_eq!(source.inner.calls.get(), 2);
        }
    }

    #[tokio::test]
    async fn test_missing_board_is_not_retried() {
        let source =
            RetryListing::new(failing_with(10, Some(404)), 3, Duration::from_secs(60)).without_jitter();
        let err = source.top_of_day("banned", 10).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Listing { status: Some(404), .. }));
        assert_eq!(source.inner.calls.get(), 1);
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let source = RetryListing::new(flaky(0), 10, Duration::from_secs(1)).without_jitter();
        assert_eq!(source.delay_for(1), Duration::from_secs(1));
        assert_eq!(source.delay_for(2), Duration::from_secs(2));
        assert_eq!(source.delay_for(3), Duration::from_secs(4));
        assert_eq!(source.delay_for(5), Duration::from_secs(10));
        assert_eq!(source.delay_for(40), Duration::from_secs(10));
    }
}
