//! Provider registry.

use crate::{
    AnthropicAdapter, CohereAdapter, GoogleAdapter, OpenAiAdapter, RekognitionAdapter,
    StabilityAdapter,
};
use dashmap::DashMap;
use gateway_config::{GatewayConfig, ProviderConfig};
use gateway_core::{GatewayError, GatewayResult, OperationType, ProviderAdapter, ProviderKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Adapters keyed by provider
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    adapters: Arc<DashMap<ProviderKind, Arc<dyn ProviderAdapter>>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.kinds())
            .finish()
    }
}

impl ProviderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adapters for every enabled provider in the configuration.
    ///
    /// Providers whose credentials are missing are skipped with a warning.
    ///
    /// # Errors
    /// Returns error if an adapter cannot be constructed for another reason
    pub fn from_config(config: &GatewayConfig) -> GatewayResult<Self> {
        let registry = Self::new();
        for provider in config.enabled_providers() {
            match build_adapter(provider, config.default_timeout) {
                Ok(adapter) => {
                    info!(provider = %provider.kind, "Registering provider");
                    registry.register(adapter);
                }
                Err(GatewayError::Validation { message, .. }) => {
                    warn!(provider = %provider.kind, reason = %message, "Provider not registered");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(registry)
    }

    /// Register an adapter, replacing any previous one for the same provider
    pub fn register(&self, adapter: Arc<dyn ProviderAdapter>) {
        let kind = adapter.kind();
        if self.adapters.insert(kind, adapter).is_some() {
            warn!(provider = %kind, "Replaced existing adapter");
        }
    }

    /// Remove a provider's adapter
    pub fn deregister(&self, kind: ProviderKind) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.remove(&kind).map(|(_, adapter)| adapter)
    }

    /// Adapter for a provider
    #[must_use]
    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&kind).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether the provider has an adapter that serves the operation
    #[must_use]
    pub fn supports(&self, kind: ProviderKind, operation: OperationType) -> bool {
        self.adapters
            .get(&kind)
            .is_some_and(|entry| entry.value().supports(operation))
    }

    /// Registered providers in stable order
    #[must_use]
    pub fn kinds(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<ProviderKind> = self.adapters.iter().map(|entry| *entry.key()).collect();
        kinds.sort();
        kinds
    }

    /// Number of registered adapters
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether no adapters are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Construct the adapter for one provider entry
///
/// # Errors
/// Returns a validation error when required credentials are missing
pub fn build_adapter(
    config: &ProviderConfig,
    default_timeout: Duration,
) -> GatewayResult<Arc<dyn ProviderAdapter>> {
    let adapter: Arc<dyn ProviderAdapter> = match config.kind {
        ProviderKind::OpenAi => Arc::new(OpenAiAdapter::new(config, default_timeout)?),
        ProviderKind::AzureOpenAi => Arc::new(OpenAiAdapter::azure(config, default_timeout)?),
        ProviderKind::Anthropic => Arc::new(AnthropicAdapter::new(config, default_timeout)?),
        ProviderKind::Google => Arc::new(GoogleAdapter::new(config, default_timeout)?),
        ProviderKind::Cohere => Arc::new(CohereAdapter::new(config, default_timeout)?),
        ProviderKind::Stability => Arc::new(StabilityAdapter::new(config, default_timeout)?),
        ProviderKind::AwsRekognition => Arc::new(RekognitionAdapter::new(config, default_timeout)?),
    };
    Ok(adapter)
}
