//! # Gateway Service
//!
//! The gateway facade. [`AiGateway`] exposes one method per operation type
//! and runs every request through the same pipeline:
//! - Request id assignment and input validation
//! - Content-addressed cache lookup
//! - Budget check
//! - Ordered provider fallback under rate limits and circuit breakers
//! - Cache write, cost accounting and metrics

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builder;
pub mod gateway;

// Re-export main types
pub use builder::AiGatewayBuilder;
pub use gateway::AiGateway;
