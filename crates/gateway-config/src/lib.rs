//! # Gateway Config
//!
//! Static configuration for the AI Gateway: enabled providers and their
//! credentials, cache, circuit breaker, rate limit and retry settings,
//! budget ceiling and logging.
//!
//! Configuration is supplied once at construction. It can be loaded from a
//! YAML or TOML file and overlaid with `AI_GATEWAY_*` environment variables.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod loader;

pub use config::{
    CacheConfig, CircuitBreakerSettings, GatewayConfig, LoggingConfig, ProviderConfig,
    ProviderRateLimits, RateLimitSettings, RetrySettings,
};
pub use error::ConfigError;
