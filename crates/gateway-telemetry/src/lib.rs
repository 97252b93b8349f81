//! # Gateway Telemetry
//!
//! Observability and accounting for the AI Gateway.
//!
//! This crate provides:
//! - The cost model and the process-wide cost ledger
//! - Prometheus metrics for monitoring
//! - Structured logging setup
//! - Statistics snapshot types

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cost;
pub mod logging;
pub mod metrics;
pub mod stats;

// Re-export main types
pub use cost::{base_cost, estimate_cost, provider_multiplier, CostLedger, CostSnapshot};
pub use logging::{build_filter, init_logging, LoggingError};
pub use metrics::GatewayMetrics;
pub use stats::GatewayStatistics;
