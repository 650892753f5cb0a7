//! Global token bucket rate limiting for the API.
//!
//! One bucket is shared by every route: tokens refill at a fixed rate and
//! each request consumes one, so short bursts up to the bucket capacity pass
//! while the sustained rate stays bounded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use voucher_core::config::RateLimitConfig;

use crate::error::ApiError;

/// Token bucket admitting requests at a sustained rate with bursts.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    /// Maximum number of tokens the bucket can hold
    capacity: u64,
    /// Current number of tokens in the bucket
    tokens: u64,
    /// Tokens added per second
    refill_rate: u64,
    /// Timestamp of last refill operation
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a full bucket. Zero capacity or rate is raised to one.
    pub fn new(capacity: u64, refill_rate: u64) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            tokens: capacity,
            refill_rate: refill_rate.max(1),
            last_refill: Instant::now(),
        }
    }

    /// Takes one token, returning whether one was available.
    pub fn try_acquire(&mut self) -> bool {
        self.refill();

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Returns current number of available tokens.
    pub fn available_tokens(&mut self) -> u64 {
        self.refill();
        self.tokens
    }

    /// Returns bucket capacity.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);

        if elapsed >= Duration::from_millis(1) {
            let tokens_to_add = (elapsed.as_secs_f64() * self.refill_rate as f64) as u64;

            if tokens_to_add > 0 {
                self.tokens = (self.tokens + tokens_to_add).min(self.capacity);
                self.last_refill = now;
            }
        }
    }
}

/// Thread-safe bucket shared by all request handlers.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    /// Creates limiter from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::new(config.burst, config.requests_per_second)),
        }
    }

    /// Whether the next request may proceed.
    pub fn check(&self) -> bool {
        self.bucket.lock().try_acquire()
    }
}

/// Middleware rejecting requests with 429 once the bucket is empty.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.check() {
        tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_starts_full() {
        let mut bucket = TokenBucket::new(5, 1);
        assert_eq!(bucket.capacity(), 5);
        assert_eq!(bucket.available_tokens(), 5);
    }

    #[test]
    fn test_burst_then_reject() {
        let mut bucket = TokenBucket::new(3, 1);
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
    }

    #[test]
    fn test_refill_over_time() {
        let mut bucket = TokenBucket::new(2, 1000);
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());

        std::thread::sleep(Duration::from_millis(20));
        assert!(bucket.try_acquire());
        assert!(bucket.available_tokens() <= 2);
    }

    #[test]
    fn test_zero_config_still_admits() {
        let mut bucket = TokenBucket::new(0, 0);
        assert_eq!(bucket.capacity(), 1);
        assert!(bucket.try_acquire());
    }

    #[test]
    fn test_limiter_from_config() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: true,
            requests_per_second: 1,
            burst: 2,
        });
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(!limiter.check());
    }
}
