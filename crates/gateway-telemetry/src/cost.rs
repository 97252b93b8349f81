//! Cost model and cost ledger.
//!
//! The model is a pure function of (provider, operation, usage). The ledger
//! accumulates results per provider, per operation and per caller, and is
//! compared against an optional monthly budget before each request.

use dashmap::DashMap;
use gateway_core::{GatewayError, GatewayResult, OperationType, ProviderKind, Usage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, warn};

/// Ledger amounts are stored as integer nano-dollars
const NANOS_PER_DOLLAR: f64 = 1_000_000_000.0;

/// Flat cost of one call before provider adjustment (USD)
#[must_use]
pub const fn base_cost(operation: OperationType) -> f64 {
    match operation {
        OperationType::TextGeneration => 0.0002,
        OperationType::ChatCompletion => 0.0003,
        OperationType::ImageGeneration => 0.02,
        OperationType::ImageAnalysis => 0.001,
        OperationType::VideoAnalysis => 0.01,
        OperationType::AudioTranscription => 0.006,
        OperationType::AudioTranslation => 0.008,
        OperationType::Embedding | OperationType::Moderation => 0.0001,
        OperationType::FunctionCalling => 0.0004,
    }
}

/// Relative price of a provider
#[must_use]
pub const fn provider_multiplier(provider: ProviderKind) -> f64 {
    match provider {
        ProviderKind::OpenAi | ProviderKind::AwsRekognition => 1.0,
        ProviderKind::Anthropic => 1.2,
        ProviderKind::Google => 0.9,
        ProviderKind::Cohere => 0.7,
        ProviderKind::Stability => 1.1,
        ProviderKind::AzureOpenAi => 1.05,
    }
}

/// Estimate the cost of one call.
///
/// Without usage the cost is flat. A prompt/completion split bills input at
/// half and output at one and a half times the flat rate per 1K tokens, and
/// takes precedence over a bare total, which bills linearly per 1K tokens.
#[must_use]
pub fn estimate_cost(
    provider: ProviderKind,
    operation: OperationType,
    usage: Option<&Usage>,
) -> f64 {
    let flat = base_cost(operation) * provider_multiplier(provider);
    let Some(usage) = usage else {
        return flat;
    };

    match (usage.prompt_tokens, usage.completion_tokens, usage.total_tokens) {
        (Some(prompt), Some(completion), _) if prompt > 0 || completion > 0 => {
            let input = f64::from(prompt) / 1000.0 * (flat * 0.5);
            let output = f64::from(completion) / 1000.0 * (flat * 1.5);
            input + output
        }
        (_, _, Some(total)) if total > 0 => flat * f64::from(total) / 1000.0,
        _ => flat,
    }
}

fn to_nanos(cost: f64) -> u64 {
    if cost.is_finite() && cost > 0.0 {
        (cost * NANOS_PER_DOLLAR).round() as u64
    } else {
        0
    }
}

fn to_dollars(nanos: u64) -> f64 {
    nanos as f64 / NANOS_PER_DOLLAR
}

fn add_to<K: Eq + Hash>(map: &DashMap<K, AtomicU64>, key: K, nanos: u64) {
    map.entry(key)
        .or_insert_with(|| AtomicU64::new(0))
        .fetch_add(nanos, Ordering::Relaxed);
}

fn collect<K: Ord + Clone + Eq + Hash>(map: &DashMap<K, AtomicU64>) -> BTreeMap<K, f64> {
    map.iter()
        .map(|entry| (entry.key().clone(), to_dollars(entry.value().load(Ordering::Relaxed))))
        .collect()
}

/// Point-in-time copy of the ledger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSnapshot {
    /// Grand total (USD)
    pub total: f64,
    /// Totals per provider
    pub by_provider: BTreeMap<ProviderKind, f64>,
    /// Totals per operation
    pub by_operation: BTreeMap<OperationType, f64>,
    /// Totals per caller
    pub by_caller: BTreeMap<String, f64>,
}

/// Running cost totals with an optional monthly ceiling
#[derive(Debug, Default)]
pub struct CostLedger {
    budget: Option<f64>,
    total: AtomicU64,
    by_provider: DashMap<ProviderKind, AtomicU64>,
    by_operation: DashMap<OperationType, AtomicU64>,
    by_caller: DashMap<String, AtomicU64>,
    budget_warned: AtomicBool,
}

impl CostLedger {
    /// Create a ledger
    #[must_use]
    pub fn new(budget: Option<f64>) -> Self {
        Self {
            budget,
            ..Default::default()
        }
    }

    /// Configured monthly ceiling
    #[must_use]
    pub const fn budget(&self) -> Option<f64> {
        self.budget
    }

    /// Add one call's cost; returns the new grand total
    pub fn record(
        &self,
        provider: ProviderKind,
        operation: OperationType,
        caller: Option<&str>,
        cost: f64,
    ) -> f64 {
        let nanos = to_nanos(cost);
        add_to(&self.by_provider, provider, nanos);
        add_to(&self.by_operation, operation, nanos);
        if let Some(caller) = caller {
            add_to(&self.by_caller, caller.to_string(), nanos);
        }
        let total = to_dollars(self.total.fetch_add(nanos, Ordering::AcqRel) + nanos);

        debug!(
            provider = %provider,
            operation = %operation,
            cost = cost,
            total = total,
            "Cost recorded"
        );

        if let Some(budget) = self.budget {
            if total >= budget && !self.budget_warned.swap(true, Ordering::AcqRel) {
                warn!(spent = total, budget = budget, "Monthly budget exceeded");
            }
        }
        total
    }

    /// Grand total (USD)
    #[must_use]
    pub fn total(&self) -> f64 {
        to_dollars(self.total.load(Ordering::Acquire))
    }

    /// Whether the total has reached the ceiling
    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.budget.is_some_and(|budget| self.total() >= budget)
    }

    /// Fail fast once the ceiling is reached
    ///
    /// # Errors
    /// Returns `BudgetExceeded` when the total meets or exceeds the budget
    pub fn check_budget(&self) -> GatewayResult<()> {
        match self.budget {
            Some(budget) if self.total() >= budget => {
                Err(GatewayError::budget_exceeded(self.total(), budget))
            }
            _ => Ok(()),
        }
    }

    /// Copy the current totals
    #[must_use]
    pub fn snapshot(&self) -> CostSnapshot {
        CostSnapshot {
            total: self.total(),
            by_provider: collect(&self.by_provider),
            by_operation: collect(&self.by_operation),
            by_caller: collect(&self.by_caller),
        }
    }

    /// Zero every total (monthly roll-over)
    pub fn reset(&self) {
        self.by_provider.clear();
        self.by_operation.clear();
        self.by_caller.clear();
        self.total.store(0, Ordering::Release);
        self.budget_warned.store(false, Ordering::Release);
        debug!("Cost ledger reset");
    }
}
