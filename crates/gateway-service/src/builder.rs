//! Construction of [`AiGateway`].

use crate::gateway::AiGateway;
use gateway_config::GatewayConfig;
use gateway_core::{GatewayError, GatewayResult};
use gateway_providers::ProviderRegistry;
use gateway_resilience::{CacheStore, MemoryCacheStore};
use gateway_routing::FallbackOrchestrator;
use gateway_telemetry::{CostLedger, GatewayMetrics};
use std::sync::Arc;

/// Builder for [`AiGateway`]
///
/// Anything not supplied is derived from the configuration: adapters for
/// every enabled provider, an in-memory cache and a fresh metrics registry.
#[derive(Default)]
pub struct AiGatewayBuilder {
    config: Option<GatewayConfig>,
    registry: Option<ProviderRegistry>,
    cache: Option<Arc<dyn CacheStore>>,
    metrics: Option<GatewayMetrics>,
}

impl std::fmt::Debug for AiGatewayBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiGatewayBuilder")
            .field("config", &self.config.is_some())
            .field("registry", &self.registry)
            .field("cache", &self.cache.as_ref().map(|c| c.name()))
            .finish_non_exhaustive()
    }
}

impl AiGatewayBuilder {
    /// Set the gateway configuration
    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a prepared adapter registry instead of building one from configuration
    #[must_use]
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a specific cache backend
    #[must_use]
    pub fn cache_store(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Record into an existing metrics registry
    #[must_use]
    pub fn metrics(mut self, metrics: GatewayMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the gateway
    ///
    /// # Errors
    /// Returns a validation error for an invalid configuration or when a
    /// provider adapter cannot be constructed
    pub fn build(self) -> GatewayResult<AiGateway> {
        let config = self.config.unwrap_or_default();
        config.validate_all()?;

        let registry = match self.registry {
            Some(registry) => registry,
            None => ProviderRegistry::from_config(&config)?,
        };
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => GatewayMetrics::new().map_err(|e| {
                GatewayError::unknown(format!("Failed to create metrics registry: {e}"))
            })?,
        };

        let cache = if config.cache.enabled {
            Some(self.cache.unwrap_or_else(|| {
                Arc::new(MemoryCacheStore::new(config.cache.max_entries)) as Arc<dyn CacheStore>
            }))
        } else {
            None
        };

        let orchestrator =
            FallbackOrchestrator::from_config(&config, registry).with_metrics(metrics.clone());
        let ledger = CostLedger::new(config.monthly_budget);

        Ok(AiGateway::from_parts(config, orchestrator, cache, ledger, metrics))
    }
}
