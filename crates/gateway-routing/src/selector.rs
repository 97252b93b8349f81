//! Candidate provider selection.

use gateway_config::GatewayConfig;
use gateway_core::{OperationType, ProviderKind};
use gateway_providers::ProviderRegistry;

/// Orders the providers that may serve an operation
#[derive(Debug, Clone, Default)]
pub struct ProviderSelector {
    order: Vec<ProviderKind>,
}

impl ProviderSelector {
    /// Create a selector with an explicit fallback order
    #[must_use]
    pub fn new(order: Vec<ProviderKind>) -> Self {
        let mut seen = Vec::with_capacity(order.len());
        for kind in order {
            if !seen.contains(&kind) {
                seen.push(kind);
            }
        }
        Self { order: seen }
    }

    /// Fallback order taken from the enabled providers in configuration order
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.enabled_providers().map(|p| p.kind).collect())
    }

    /// Configured fallback order
    #[must_use]
    pub fn order(&self) -> &[ProviderKind] {
        &self.order
    }

    /// Candidates for an operation: enabled providers whose adapter serves it,
    /// in configuration order, with `preferred` moved to the front when eligible.
    #[must_use]
    pub fn candidates(
        &self,
        registry: &ProviderRegistry,
        operation: OperationType,
        preferred: Option<ProviderKind>,
    ) -> Vec<ProviderKind> {
        let mut candidates: Vec<ProviderKind> = self
            .order
            .iter()
            .copied()
            .filter(|kind| registry.supports(*kind, operation))
            .collect();

        if let Some(preferred) = preferred {
            if let Some(index) = candidates.iter().position(|k| *k == preferred) {
                let kind = candidates.remove(index);
                candidates.insert(0, kind);
            }
        }
        candidates
    }
}
