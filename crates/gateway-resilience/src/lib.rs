//! # Gateway Resilience
//!
//! Resilience patterns for the AI Gateway:
//! - Circuit breaker isolating failing providers
//! - Fixed-window rate limiter per provider and per caller
//! - Same-provider retry policy with exponential backoff
//! - Content-addressed result cache (in-memory or Redis)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod circuit_breaker;
pub mod rate_limiter;
pub mod retry;

// Re-export main types
pub use cache::{cache_key, CacheStore, MemoryCacheStore, RedisCacheStore};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitSnapshot, CircuitState,
};
pub use rate_limiter::{RateLimitDecision, RateLimiter, RateLimiterConfig};
pub use retry::{RetryConfig, RetryPolicy};
