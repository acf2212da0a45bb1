//! Rate limiter implementation
//!
//! Per-credential request budgets counted in the shared cache, so every
//! gateway instance sees the same counters.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::cache::{Cache, CacheKeys};
use crate::domain::clock::SharedClock;
use crate::domain::DomainError;

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Total limit for the window; 0 when unlimited
    pub limit: u32,
    /// Time until the limit resets (in seconds)
    pub reset_in_seconds: u64,
}

impl RateLimitResult {
    pub fn unlimited() -> Self {
        Self {
            allowed: true,
            remaining: u32::MAX,
            limit: 0,
            reset_in_seconds: 0,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.limit == 0
    }
}

/// Counting algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitAlgorithm {
    /// One counter per aligned window
    #[default]
    FixedWindow,
    /// Current window plus the previous window weighted by its remaining overlap
    SlidingWindow,
}

impl std::str::FromStr for RateLimitAlgorithm {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed_window" => Ok(Self::FixedWindow),
            "sliding_window" => Ok(Self::SlidingWindow),
            other => Err(DomainError::configuration(format!(
                "Unknown rate limit algorithm: {}. Valid: fixed_window, sliding_window",
                other
            ))),
        }
    }
}

/// Rate limiter for API keys
#[derive(Debug, Clone)]
pub struct RateLimiter {
    cache: Arc<dyn Cache>,
    keys: CacheKeys,
    clock: SharedClock,
    window: Duration,
    algorithm: RateLimitAlgorithm,
}

impl RateLimiter {
    pub fn new(
        cache: Arc<dyn Cache>,
        keys: CacheKeys,
        clock: SharedClock,
        window: Duration,
        algorithm: RateLimitAlgorithm,
    ) -> Self {
        Self {
            cache,
            keys,
            clock,
            window: window.max(Duration::from_secs(1)),
            algorithm,
        }
    }

    /// Count one request against `limit` and decide whether it may proceed
    ///
    /// The increment is a single atomic cache operation. A rejected request
    /// gives its increment back, so the counter only holds admitted requests.
    pub async fn check_and_record(
        &self,
        api_key: &str,
        limit: u32,
    ) -> Result<RateLimitResult, DomainError> {
        if limit == 0 {
            return Ok(RateLimitResult::unlimited());
        }

        let window_secs = self.window.as_secs() as i64;
        let now_millis = self.clock.now().timestamp_millis();
        let window_index = now_millis.div_euclid(window_secs * 1000);
        let elapsed_millis = now_millis.rem_euclid(window_secs * 1000);
        let reset_in_seconds = (window_secs * 1000 - elapsed_millis + 999) as u64 / 1000;

        let key = self.keys.rate_window(api_key, window_index);
        // Keep the counter through the next window so the sliding estimate can read it
        let ttl = self.window * 2;
        let count = self.cache.increment_with_ttl(&key, 1, ttl).await?;

        let effective = match self.algorithm {
            RateLimitAlgorithm::FixedWindow => count as f64,
            RateLimitAlgorithm::SlidingWindow => {
                let previous_key = self.keys.rate_window(api_key, window_index - 1);
                let previous = self
                    .cache
                    .get_raw(&previous_key)
                    .await?
                    .and_then(|v| v.parse::<i64>().ok())
                    .unwrap_or(0);
                let overlap = 1.0 - elapsed_millis as f64 / (window_secs * 1000) as f64;
                count as f64 + previous as f64 * overlap
            }
        };

        if effective > f64::from(limit) {
            if let Err(e) = self.cache.increment_with_ttl(&key, -1, ttl).await {
                tracing::warn!(api_key = %api_key, error = %e, "Failed to roll back rate counter");
            }

            return Ok(RateLimitResult {
                allowed: false,
                remaining: 0,
                limit,
                reset_in_seconds,
            });
        }

        Ok(RateLimitResult {
            allowed: true,
            remaining: (f64::from(limit) - effective).floor().max(0.0) as u32,
            limit,
            reset_in_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::domain::cache::MockCache;
    use crate::domain::clock::ManualClock;
    use crate::infrastructure::cache::InMemoryCache;

    fn limiter(algorithm: RateLimitAlgorithm) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_minute_start());
        let limiter = RateLimiter::new(
            Arc::new(InMemoryCache::new()),
            CacheKeys::default(),
            clock.clone(),
            Duration::from_secs(60),
            algorithm,
        );
        (limiter, clock)
    }

    #[tokio::test]
    async fn test_allows_first_request() {
        let (limiter, _) = limiter(RateLimitAlgorithm::FixedWindow);

        let result = limiter.check_and_record("key1", 10).await.unwrap();

        assert!(result.allowed);
        assert_eq!(result.remaining, 9);
        assert_eq!(result.limit, 10);
        assert_eq!(result.reset_in_seconds, 60);
    }

    #[tokio::test]
    async fn test_n_plus_first_request_is_rejected() {
        let (limiter, clock) = limiter(RateLimitAlgorithm::FixedWindow);

        assert!(limiter.check_and_record("c", 2).await.unwrap().allowed);
        clock.advance(ChronoDuration::seconds(10));
        assert!(limiter.check_and_record("c", 2).await.unwrap().allowed);
        clock.advance(ChronoDuration::seconds(10));

        let third = limiter.check_and_record("c", 2).await.unwrap();
        assert!(!third.allowed);
        assert_eq!(third.remaining, 0);
        assert_eq!(third.reset_in_seconds, 40);

        assert!(!limiter.check_and_record("c", 2).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_new_window_resets_count() {
        let (limiter, clock) = limiter(RateLimitAlgorithm::FixedWindow);

        limiter.check_and_record("c", 2).await.unwrap();
        limiter.check_and_record("c", 2).await.unwrap();
        assert!(!limiter.check_and_record("c", 2).await.unwrap().allowed);

        clock.advance(ChronoDuration::seconds(60));

        let result = limiter.check_and_record("c", 2).await.unwrap();
        assert!(result.allowed);
        assert_eq!(result.remaining, 1);
    }

    #[tokio::test]
    async fn test_rejections_do_not_consume_budget() {
        let (limiter, _) = limiter(RateLimitAlgorithm::FixedWindow);

        limiter.check_and_record("c", 1).await.unwrap();
        for _ in 0..5 {
            assert!(!limiter.check_and_record("c", 1).await.unwrap().allowed);
        }

        let stored = limiter
            .cache
            .get_raw(&CacheKeys::default().rate_window("c", limiter_window_index(&limiter)))
            .await
            .unwrap();
        assert_eq!(stored, Some("1".to_string()));
    }

    fn limiter_window_index(limiter: &RateLimiter) -> i64 {
        limiter.clock.now().timestamp() / 60
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (limiter, _) = limiter(RateLimitAlgorithm::FixedWindow);

        limiter.check_and_record("key1", 1).await.unwrap();

        assert!(limiter.check_and_record("key2", 1).await.unwrap().allowed);
        assert!(!limiter.check_and_record("key1", 1).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_zero_limit_is_unlimited() {
        let (limiter, _) = limiter(RateLimitAlgorithm::FixedWindow);

        for _ in 0..100 {
            let result = limiter.check_and_record("key1", 0).await.unwrap();
            assert!(result.allowed);
            assert!(result.is_unlimited());
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_admit_exactly_the_limit() {
        let (limiter, _) = limiter(RateLimitAlgorithm::FixedWindow);

        let handles: Vec<_> = (0..40)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.check_and_record("c", 10).await.unwrap() })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().allowed {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 10);
    }

    #[tokio::test]
    async fn test_sliding_window_weights_previous_window() {
        let (limiter, clock) = limiter(RateLimitAlgorithm::SlidingWindow);

        for _ in 0..4 {
            assert!(limiter.check_and_record("c", 4).await.unwrap().allowed);
        }

        // A quarter into the next window, 3 of the previous 4 still count
        clock.advance(ChronoDuration::seconds(75));

        assert!(limiter.check_and_record("c", 4).await.unwrap().allowed);
        assert!(!limiter.check_and_record("c", 4).await.unwrap().allowed);

        // Near the end of the window the previous one barely counts
        clock.advance(ChronoDuration::seconds(40));
        assert!(limiter.check_and_record("c", 4).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_cache_failure_propagates() {
        let limiter = RateLimiter::new(
            Arc::new(MockCache::new().with_error("down")),
            CacheKeys::default(),
            Arc::new(ManualClock::at_minute_start()),
            Duration::from_secs(60),
            RateLimitAlgorithm::FixedWindow,
        );

        assert!(limiter.check_and_record("c", 5).await.is_err());
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!(
            "sliding_window".parse::<RateLimitAlgorithm>().unwrap(),
            RateLimitAlgorithm::SlidingWindow
        );
        assert!("token_bucket".parse::<RateLimitAlgorithm>().is_err());
    }
}
