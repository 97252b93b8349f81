//! Prometheus metrics for gateway traffic.

use gateway_core::{OperationType, ProviderKind};
use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Metrics registry for one gateway instance
#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    cache_lookups: IntCounterVec,
    fallback_skips: IntCounterVec,
    cost_by_provider: CounterVec,
    cost_total: Counter,
}

impl std::fmt::Debug for GatewayMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMetrics").finish_non_exhaustive()
    }
}

impl GatewayMetrics {
    /// Create the metric families on a fresh registry
    ///
    /// # Errors
    /// Returns an error if a metric cannot be created or registered
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("ai_gateway".to_string()), None)?;

        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Gateway requests by operation, provider and outcome"),
            &["operation", "provider", "outcome"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "End-to-end request latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["operation"],
        )?;
        let cache_lookups = IntCounterVec::new(
            Opts::new("cache_lookups_total", "Cache lookups by result"),
            &["operation", "result"],
        )?;
        let fallback_skips = IntCounterVec::new(
            Opts::new("fallback_skips_total", "Candidates skipped during fallback"),
            &["provider", "reason"],
        )?;
        let cost_by_provider = CounterVec::new(
            Opts::new("cost_usd", "Accumulated cost in USD by provider"),
            &["provider"],
        )?;
        let cost_total =
            Counter::with_opts(Opts::new("cost_usd_total", "Accumulated cost in USD"))?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(cache_lookups.clone()))?;
        registry.register(Box::new(fallback_skips.clone()))?;
        registry.register(Box::new(cost_by_provider.clone()))?;
        registry.register(Box::new(cost_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            cache_lookups,
            fallback_skips,
            cost_by_provider,
            cost_total,
        })
    }

    /// Count a finished request. `provider` is `"cache"` for cache hits and
    /// `"none"` when no provider produced a result.
    pub fn record_request(
        &self,
        operation: OperationType,
        provider: &str,
        outcome: &str,
        seconds: f64,
    ) {
        self.requests_total
            .with_label_values(&[operation.as_str(), provider, outcome])
            .inc();
        self.request_duration
            .with_label_values(&[operation.as_str()])
            .observe(seconds);
    }

    /// Count a cache lookup
    pub fn record_cache_lookup(&self, operation: OperationType, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.cache_lookups
            .with_label_values(&[operation.as_str(), result])
            .inc();
    }

    /// Count a skipped fallback candidate
    pub fn record_skip(&self, provider: ProviderKind, reason: &str) {
        self.fallback_skips
            .with_label_values(&[provider.as_str(), reason])
            .inc();
    }

    /// Add to the cost counters
    pub fn record_cost(&self, provider: ProviderKind, cost: f64) {
        if cost > 0.0 {
            self.cost_by_provider
                .with_label_values(&[provider.as_str()])
                .inc_by(cost);
            self.cost_total.inc_by(cost);
        }
    }

    /// Underlying registry
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format
    #[must_use]
    pub fn gather_text(&self) -> String {
        let mut buffer = Vec::new();
        if TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .is_err()
        {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
