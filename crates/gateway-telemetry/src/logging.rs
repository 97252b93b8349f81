//! Structured logging setup.

use gateway_config::LoggingConfig;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The filter directive could not be parsed
    #[error("Invalid log filter '{directive}': {message}")]
    Filter {
        /// Directive as configured
        directive: String,
        /// Parser message
        message: String,
    },
    /// A global subscriber is already installed
    #[error("Failed to initialize logging: {0}")]
    Init(String),
}

/// Build the filter: `RUST_LOG` wins over the configured level
///
/// # Errors
/// Returns `LoggingError::Filter` if the configured directive is malformed
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| LoggingError::Filter {
        directive: config.level.clone(),
        message: e.to_string(),
    })
}

/// Install the global subscriber
///
/// # Errors
/// Returns error if the filter is invalid or a subscriber is already set
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(config)?;

    let fmt_layer = if config.json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    info!(level = %config.level, json = config.json, "Logging initialized");
    Ok(())
}

/// Span covering one gateway operation
#[macro_export]
macro_rules! operation_span {
    ($request_id:expr, $operation:expr) => {
        tracing::info_span!(
            "gateway_operation",
            request_id = %$request_id,
            operation = %$operation
        )
    };
}

/// Span covering one provider attempt
#[macro_export]
macro_rules! provider_span {
    ($provider:expr, $operation:expr) => {
        tracing::info_span!(
            "provider_call",
            provider = %$provider,
            operation = %$operation
        )
    };
}
