//! # Gateway Routing
//!
//! Provider selection and fallback for the AI Gateway.
//!
//! This crate provides:
//! - Candidate ordering by configuration with preferred-provider precedence
//! - The fallback orchestrator guarding each candidate with the rate limiter
//!   and circuit breaker, retrying transient failures on the same provider

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fallback;
pub mod selector;

// Re-export main types
pub use fallback::{
    breaker_config, retry_config, CallSettings, FallbackOrchestrator, FallbackOutcome,
};
pub use selector::ProviderSelector;
