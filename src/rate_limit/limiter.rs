//! # Fixed-Window Rate Limiter
//!
//! Per-identity admission gate.
//!
//! ## Algorithm:
//! 1. No window yet, or the window has run its full length: start a new one
//!    with a count of 1 and admit
//! 2. Otherwise count the attempt; admit while `count <= max_requests`
//! 3. Past the cap: throttle, telling the caller how many whole seconds remain
//!    until the window rolls over

use crate::config::RateLimitPolicyConfig;
use crate::rate_limit::store::{InMemoryWindowStore, WindowStore};
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Window length and request cap for one limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_requests: u32,
}

impl RateLimitPolicy {
    /// Lenient default applied to every API route: 100 requests per 15 minutes.
    pub fn general() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            max_requests: 100,
        }
    }

    /// Stricter policy for the translation endpoint: 20 requests per 5 minutes.
    pub fn translation() -> Self {
        Self {
            window: Duration::from_secs(5 * 60),
            max_requests: 20,
        }
    }
}

impl From<&RateLimitPolicyConfig> for RateLimitPolicy {
    fn from(config: &RateLimitPolicyConfig) -> Self {
        Self {
            window: Duration::from_millis(config.window_ms),
            max_requests: config.max_requests,
        }
    }
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed {
        limit: u32,
        remaining: u32,
        reset_after_seconds: u64,
    },
    Throttled {
        retry_after_seconds: u64,
    },
}

/// A named policy bound to a counter store.
pub struct RateLimiter {
    name: &'static str,
    policy: RateLimitPolicy,
    store: Arc<dyn WindowStore>,
}

impl RateLimiter {
    pub fn new(name: &'static str, policy: RateLimitPolicy, store: Arc<dyn WindowStore>) -> Self {
        Self { name, policy, store }
    }

    /// Limiter with its own process-local store.
    pub fn in_memory(name: &'static str, policy: RateLimitPolicy) -> Self {
        Self::new(name, policy, Arc::new(InMemoryWindowStore::new()))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Check and count one attempt by `identity` at `now`.
    ///
    /// Store failures are returned to the caller, which decides whether to
    /// fail open or closed.
    pub async fn admit(&self, identity: &str, now: Instant) -> Result<Decision> {
        let key = format!("{}:{}", self.name, identity);
        let state = self.store.hit(&key, now, self.policy.window).await?;

        let window_end = state.window_start + self.policy.window;
        let remaining_window = window_end.saturating_duration_since(now);

        if state.count <= self.policy.max_requests {
            return Ok(Decision::Allowed {
                limit: self.policy.max_requests,
                remaining: self.policy.max_requests - state.count,
                reset_after_seconds: ceil_seconds(remaining_window),
            });
        }

        let retry_after_seconds = ceil_seconds(remaining_window);
        warn!(
            limiter = self.name,
            identity = %identity,
            count = state.count,
            retry_after_seconds,
            "Rate limit exceeded"
        );
        Ok(Decision::Throttled { retry_after_seconds })
    }

    /// Drop counters whose window has fully elapsed.
    pub async fn purge_expired(&self, now: Instant) -> Result<usize> {
        self.store.purge_expired(now, self.policy.window).await
    }
}

/// Whole seconds, rounding any fraction (down to a nanosecond) up.
fn ceil_seconds(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Decision {
        fn is_allowed(&self) -> bool {
            matches!(self, Decision::Allowed { .. })
        }
    }

    fn policy(max_requests: u32, window_secs: u64) -> RateLimitPolicy {
        RateLimitPolicy {
            window: Duration::from_secs(window_secs),
            max_requests,
        }
    }

    #[tokio::test]
    async fn test_n_plus_first_request_is_throttled() {
        let limiter = RateLimiter::in_memory("test", policy(3, 60));
        let start = Instant::now();

        for i in 0..3 {
            let decision = limiter.admit("1.2.3.4", start + Duration::from_secs(i)).await.unwrap();
            assert!(decision.is_allowed(), "request {} should pass", i + 1);
        }

        let decision = limiter.admit("1.2.3.4", start + Duration::from_secs(10)).await.unwrap();
        assert_eq!(decision, Decision::Throttled { retry_after_seconds: 50 });
    }

    #[tokio::test]
    async fn test_rollover_admits_again() {
        let limiter = RateLimiter::in_memory("test", policy(1, 60));
        let start = Instant::now();

        assert!(limiter.admit("x", start).await.unwrap().is_allowed());
        assert!(!limiter.admit("x", start + Duration::from_secs(59)).await.unwrap().is_allowed());
        assert!(limiter.admit("x", start + Duration::from_secs(60)).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_retry_after_rounds_up() {
        let limiter = RateLimiter::in_memory("test", policy(1, 60));
        let start = Instant::now();
        limiter.admit("x", start).await.unwrap();

        let decision = limiter.admit("x", start + Duration::from_millis(58_001)).await.unwrap();
        assert_eq!(decision, Decision::Throttled { retry_after_seconds: 2 });
    }

    #[tokio::test]
    async fn test_retry_after_never_rounds_to_zero() {
        let limiter = RateLimiter::in_memory("test", policy(1, 60));
        let start = Instant::now();
        limiter.admit("x", start).await.unwrap();

        // under a millisecond left in the window
        let decision = limiter
            .admit("x", start + Duration::from_micros(59_999_600))
            .await
            .unwrap();
        assert_eq!(decision, Decision::Throttled { retry_after_seconds: 1 });
    }

    #[test]
    fn test_ceil_seconds() {
        assert_eq!(ceil_seconds(Duration::ZERO), 0);
        assert_eq!(ceil_seconds(Duration::from_nanos(1)), 1);
        assert_eq!(ceil_seconds(Duration::from_secs(5)), 5);
        assert_eq!(ceil_seconds(Duration::from_millis(5_001)), 6);
    }

    #[tokio::test]
    async fn test_allowed_reports_remaining_budget() {
        let limiter = RateLimiter::in_memory("test", policy(5, 60));
        let start = Instant::now();
        limiter.admit("x", start).await.unwrap();

        let decision = limiter.admit("x", start + Duration::from_secs(30)).await.unwrap();
        assert_eq!(
            decision,
            Decision::Allowed {
                limit: 5,
                remaining: 3,
                reset_after_seconds: 30
            }
        );
    }

    #[tokio::test]
    async fn test_limiters_sharing_a_store_do_not_collide() {
        let store: Arc<dyn WindowStore> = Arc::new(InMemoryWindowStore::new());
        let strict = RateLimiter::new("strict", policy(1, 60), Arc::clone(&store));
        let lenient = RateLimiter::new("lenient", policy(10, 60), store);
        let now = Instant::now();

        assert!(strict.admit("ip", now).await.unwrap().is_allowed());
        assert!(lenient.admit("ip", now).await.unwrap().is_allowed());
        assert!(!strict.admit("ip", now).await.unwrap().is_allowed());
        assert!(lenient.admit("ip", now).await.unwrap().is_allowed());
    }

    #[test]
    fn test_named_policies() {
        assert_eq!(RateLimitPolicy::general(), policy(100, 900));
        assert_eq!(RateLimitPolicy::translation(), policy(20, 300));
    }
}
