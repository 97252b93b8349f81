//! Read-only statistics exposed by the gateway.

use crate::cost::CostSnapshot;
use gateway_core::{OperationType, ProviderKind};
use gateway_resilience::CircuitSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate view of cost and provider health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayStatistics {
    /// Total cost (USD)
    pub total_cost: f64,
    /// Cost per provider
    pub cost_by_provider: BTreeMap<ProviderKind, f64>,
    /// Cost per operation
    pub cost_by_operation: BTreeMap<OperationType, f64>,
    /// Cost per caller
    pub cost_by_caller: BTreeMap<String, f64>,
    /// Breaker state per provider that has seen traffic
    pub circuit_breakers: BTreeMap<ProviderKind, CircuitSnapshot>,
    /// Providers enabled in configuration, in preference order
    pub enabled_providers: Vec<ProviderKind>,
    /// Configured monthly ceiling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_budget: Option<f64>,
}

impl GatewayStatistics {
    /// Assemble statistics from their parts
    #[must_use]
    pub fn new(
        cost: CostSnapshot,
        circuit_breakers: BTreeMap<ProviderKind, CircuitSnapshot>,
        enabled_providers: Vec<ProviderKind>,
        monthly_budget: Option<f64>,
    ) -> Self {
        Self {
            total_cost: cost.total,
            cost_by_provider: cost.by_provider,
            cost_by_operation: cost.by_operation,
            cost_by_caller: cost.by_caller,
            circuit_breakers,
            enabled_providers,
            monthly_budget,
        }
    }

    /// Remaining budget, if one is configured
    #[must_use]
    pub fn budget_remaining(&self) -> Option<f64> {
        self.monthly_budget
            .map(|budget| (budget - self.total_cost).max(0.0))
    }
}
