//! Test helper utilities for integration tests

use crate::mock_providers::MockAdapter;
use gateway_config::GatewayConfig;
use gateway_core::ProviderKind;
use gateway_providers::ProviderRegistry;
use gateway_resilience::CircuitState;
use gateway_service::AiGateway;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for tests (only once)
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
});

/// Initialize tracing for tests
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Gateway wired to in-process mock adapters
pub struct TestGateway {
    /// The gateway under test
    pub gateway: AiGateway,
    adapters: BTreeMap<ProviderKind, Arc<MockAdapter>>,
}

impl TestGateway {
    /// Build a gateway whose registry holds exactly the given adapters
    pub fn new(config: GatewayConfig, adapters: Vec<Arc<MockAdapter>>) -> Self {
        init_tracing();
        let registry = ProviderRegistry::new();
        let mut by_kind = BTreeMap::new();
        for adapter in adapters {
            registry.register(adapter.clone());
            by_kind.insert(gateway_core::ProviderAdapter::kind(adapter.as_ref()), adapter);
        }
        let gateway = AiGateway::builder()
            .config(config)
            .registry(registry)
            .build()
            .expect("Failed to build gateway");
        Self {
            gateway,
            adapters: by_kind,
        }
    }

    /// Adapter registered for a provider
    pub fn adapter(&self, kind: ProviderKind) -> &MockAdapter {
        self.adapters.get(&kind).expect("adapter registered")
    }

    /// Calls made to a provider's adapter
    pub fn calls(&self, kind: ProviderKind) -> usize {
        self.adapter(kind).calls()
    }

    /// Breaker state for a provider, if it has seen traffic
    pub fn breaker_state(&self, kind: ProviderKind) -> Option<CircuitState> {
        self.gateway
            .statistics()
            .circuit_breakers
            .get(&kind)
            .map(|snapshot| snapshot.state)
    }
}
