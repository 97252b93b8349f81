//! Provider adapter capability.
//!
//! One adapter exists per backend. The gateway never branches on the
//! provider: it looks adapters up by [`ProviderKind`] and calls
//! [`ProviderAdapter::execute`].

use crate::error::GatewayResult;
use crate::operation::OperationType;
use crate::request::OperationInput;
use crate::response::{OperationOutput, Usage};
use crate::types::ProviderKind;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Canonical output of a single provider call
#[derive(Debug, Clone)]
pub struct ProviderRawResult {
    /// Parsed output
    pub output: OperationOutput,
    /// Token usage, when the provider reports it
    pub usage: Option<Usage>,
    /// Provider response body
    pub raw: Value,
}

impl ProviderRawResult {
    /// Create a result without usage
    #[must_use]
    pub fn new(output: OperationOutput, raw: Value) -> Self {
        Self {
            output,
            usage: None,
            raw,
        }
    }

    /// Attach usage
    #[must_use]
    pub fn with_usage(mut self, usage: Option<Usage>) -> Self {
        self.usage = usage;
        self
    }
}

/// Adapter between canonical operations and one provider's API
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider this adapter talks to
    fn kind(&self) -> ProviderKind;

    /// Operation types the provider can serve
    fn supported_operations(&self) -> &[OperationType];

    /// Whether the provider can serve an operation
    fn supports(&self, operation: OperationType) -> bool {
        self.supported_operations().contains(&operation)
    }

    /// Perform one outbound call.
    ///
    /// Must only be called for supported operations and must give up once
    /// `timeout` has elapsed. Never mutates gateway state.
    ///
    /// # Errors
    /// Returns a classified `GatewayError` on non-2xx, transport failure or timeout
    async fn execute(
        &self,
        input: &OperationInput,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult>;
}
