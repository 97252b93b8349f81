//! Error taxonomy for the gateway.
//!
//! Every failure that crosses the gateway boundary is exactly one of the
//! eight [`ErrorKind`]s. Provider adapters, the fallback orchestrator and the
//! gateway facade all construct errors through the helpers on
//! [`GatewayError`] so classification stays in one place.

use crate::types::ProviderKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result alias used across the gateway crates
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Closed set of error classifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing request fields
    Validation,
    /// Provider rejected credentials
    Authentication,
    /// Provider or caller window exhausted
    RateLimitExceeded,
    /// Provider call exceeded its deadline
    Timeout,
    /// Circuit breaker open for the provider
    CircuitOpen,
    /// Generic provider failure
    Provider,
    /// Monthly cost ceiling reached
    BudgetExceeded,
    /// Unclassified failure
    Unknown,
}

impl ErrorKind {
    /// Stable string id
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::Authentication => "authentication_error",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::Timeout => "timeout_error",
            Self::CircuitOpen => "circuit_open",
            Self::Provider => "provider_error",
            Self::BudgetExceeded => "budget_exceeded",
            Self::Unknown => "unknown_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway error
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Request failed validation
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable message
        message: String,
        /// Offending field, if known
        field: Option<String>,
        /// Machine-readable code
        code: String,
    },

    /// Provider rejected credentials
    #[error("Authentication error for {provider}: {message}")]
    Authentication {
        /// Provider that rejected the call
        provider: ProviderKind,
        /// Human-readable message
        message: String,
        /// HTTP status, if the rejection came over HTTP
        status_code: Option<u16>,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Provider whose window was exhausted, if a single one
        provider: Option<ProviderKind>,
        /// Human-readable message
        message: String,
        /// Provider-suggested wait
        retry_after: Option<Duration>,
    },

    /// Provider call timed out
    #[error("Request to {provider} timed out after {timeout:?}")]
    Timeout {
        /// Provider that timed out
        provider: ProviderKind,
        /// Deadline that elapsed
        timeout: Duration,
    },

    /// Circuit breaker open
    #[error("Circuit breaker open for {provider}")]
    CircuitOpen {
        /// Provider whose breaker is open
        provider: ProviderKind,
    },

    /// Provider returned an error or the transport failed
    #[error(
        "Provider error{}: {message}",
        .provider.map(|p| format!(" from {p}")).unwrap_or_default()
    )]
    Provider {
        /// Provider that failed, absent when no provider was attempted
        provider: Option<ProviderKind>,
        /// Human-readable message
        message: String,
        /// HTTP status, if any
        status_code: Option<u16>,
        /// Whether a same-provider retry may succeed
        retryable: bool,
    },

    /// Monthly budget exhausted
    #[error("Monthly budget exceeded: spent ${spent:.4} of ${budget:.2}")]
    BudgetExceeded {
        /// Total recorded spend
        spent: f64,
        /// Configured ceiling
        budget: f64,
    },

    /// Catch-all
    #[error("Unknown error: {message}")]
    Unknown {
        /// Human-readable message
        message: String,
    },
}

impl GatewayError {
    /// Create a validation error
    pub fn validation(
        message: impl Into<String>,
        field: Option<String>,
        code: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            field,
            code: code.into(),
        }
    }

    /// Validation error for a missing or empty required field
    pub fn required(field: &str) -> Self {
        Self::validation(
            format!("{field} is required"),
            Some(field.to_string()),
            format!("missing_{field}"),
        )
    }

    /// Create an authentication error
    pub fn authentication(
        provider: ProviderKind,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::Authentication {
            provider,
            message: message.into(),
            status_code,
        }
    }

    /// Create a rate limit error
    pub fn rate_limit(provider: Option<ProviderKind>, message: impl Into<String>) -> Self {
        Self::RateLimitExceeded {
            provider,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Create a timeout error
    pub fn timeout(provider: ProviderKind, timeout: Duration) -> Self {
        Self::Timeout { provider, timeout }
    }

    /// Create a circuit-open error
    pub fn circuit_open(provider: ProviderKind) -> Self {
        Self::CircuitOpen { provider }
    }

    /// Create a provider error
    pub fn provider(
        provider: ProviderKind,
        message: impl Into<String>,
        status_code: Option<u16>,
        retryable: bool,
    ) -> Self {
        Self::Provider {
            provider: Some(provider),
            message: message.into(),
            status_code,
            retryable,
        }
    }

    /// Error raised when no candidate could be attempted
    pub fn no_available_providers(operation: crate::OperationType) -> Self {
        Self::Provider {
            provider: None,
            message: format!("No available providers for {operation}"),
            status_code: None,
            retryable: false,
        }
    }

    /// Create a budget exceeded error
    pub fn budget_exceeded(spent: f64, budget: f64) -> Self {
        Self::BudgetExceeded { spent, budget }
    }

    /// Create an unknown error
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Classification of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::RateLimitExceeded { .. } => ErrorKind::RateLimitExceeded,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            Self::Provider { .. } => ErrorKind::Provider,
            Self::BudgetExceeded { .. } => ErrorKind::BudgetExceeded,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Provider the error is attributed to, if any
    #[must_use]
    pub fn provider_kind(&self) -> Option<ProviderKind> {
        match self {
            Self::Authentication { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::CircuitOpen { provider } => Some(*provider),
            Self::RateLimitExceeded { provider, .. } | Self::Provider { provider, .. } => {
                *provider
            }
            _ => None,
        }
    }

    /// HTTP status attached to the error, if any
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Authentication { status_code, .. } | Self::Provider { status_code, .. } => {
                *status_code
            }
            Self::RateLimitExceeded { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether the same provider may be retried for this error.
    ///
    /// Only transient transport conditions qualify; 4xx rejections never do.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Provider { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Whether the error counts against the provider's circuit breaker
    #[must_use]
    pub const fn is_provider_failure(&self) -> bool {
        !matches!(
            self,
            Self::Validation { .. } | Self::CircuitOpen { .. } | Self::BudgetExceeded { .. }
        )
    }
}
