//! Integration tests for the AI Gateway
//!
//! This crate provides behavioural tests covering:
//! - Result caching
//! - Circuit breaking
//! - Rate limiting
//! - Fallback ordering and preferred providers
//! - Cost accounting and budget enforcement
//! - Error classification
//! - End-to-end flows against mocked provider HTTP APIs

pub mod fixtures;
pub mod helpers;
pub mod mock_providers;

// Re-export commonly used items
pub use fixtures::*;
pub use helpers::*;
pub use mock_providers::*;

#[cfg(test)]
mod cache_tests;
#[cfg(test)]
mod circuit_breaker_tests;
#[cfg(test)]
mod cost_tests;
#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
mod error_tests;
#[cfg(test)]
mod rate_limit_tests;
#[cfg(test)]
mod routing_tests;
