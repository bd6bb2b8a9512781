//! Call-rate limiting for batch embedding requests.

use crate::error::{EtoError, Result};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces calls at least `1 / calls_per_second` apart.
///
/// Callers are served one at a time; a caller arriving early waits until
/// its slot opens.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Allow at most `calls_per_second` calls per second. Fractional rates
    /// such as 0.9 are allowed.
    pub fn per_second(calls_per_second: f64) -> Result<Self> {
        if calls_per_second.is_nan() || calls_per_second <= 0.0 {
            return Err(EtoError::Config(format!(
                "rate limit must be positive, got {}",
                calls_per_second
            )));
        }

        let min_interval = if calls_per_second.is_infinite() {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / calls_per_second)
        };

        Ok(Self {
            min_interval,
            next_slot: Mutex::new(None),
        })
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until another call is allowed, and claim it.
    pub async fn acquire(&self) {
        let mut next_slot = self.next_slot.lock().await;
        if let Some(at) = *next_slot {
            tokio::time::sleep_until(at).await;
        }
        *next_slot = Some(Instant::now() + self.min_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_rates() {
        assert!(RateLimiter::per_second(0.0).is_err());
        assert!(RateLimiter::per_second(-1.0).is_err());
        assert!(RateLimiter::per_second(f64::NAN).is_err());
    }

    #[test]
    fn test_fractional_rate_interval() {
        let limiter = RateLimiter::per_second(0.9).unwrap();
        let interval = limiter.min_interval().as_secs_f64();
        assert!((interval - 1.0 / 0.9).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_are_spaced() {
        let limiter = RateLimiter::per_second(0.5).unwrap();
        let started = Instant::now();

        limiter.acquire().await;
        assert_eq!(started.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_idle_period() {
        let limiter = RateLimiter::per_second(1.0).unwrap();
        limiter.acquire().await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
