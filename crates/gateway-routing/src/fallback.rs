//! Ordered fallback across providers.
//!
//! Candidates are tried one at a time. A candidate whose rate window is full
//! or whose circuit is open is skipped without a network call. The first
//! success wins; otherwise the last provider error is returned, or the last
//! skip reason when no candidate was ever called.

use crate::selector::ProviderSelector;
use gateway_config::{CircuitBreakerSettings, GatewayConfig, RetrySettings};
use gateway_core::{
    GatewayError, GatewayResult, OperationInput, OperationType, ProviderAdapter, ProviderKind,
    ProviderRawResult, RequestEnvelope,
};
use gateway_providers::ProviderRegistry;
use gateway_resilience::{
    CircuitBreakerConfig, CircuitBreakerRegistry, RateLimitDecision, RateLimiter,
    RateLimiterConfig, RetryConfig, RetryPolicy,
};
use gateway_telemetry::{estimate_cost, provider_span, GatewayMetrics};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

/// Per-provider call limits
#[derive(Debug, Clone, Copy, Default)]
pub struct CallSettings {
    /// Call deadline
    pub timeout: Option<Duration>,
    /// Same-provider retries for transient failures
    pub max_retries: Option<u32>,
}

/// Successful outcome of a fallback run
#[derive(Debug)]
pub struct FallbackOutcome {
    /// Provider that served the request
    pub provider: ProviderKind,
    /// Adapter result
    pub result: ProviderRawResult,
    /// Cost of the call in USD
    pub cost: f64,
    /// Candidates skipped or failed before the winner
    pub attempts: usize,
}

/// Tries candidate providers in order under rate limits and circuit breakers
pub struct FallbackOrchestrator {
    registry: ProviderRegistry,
    selector: ProviderSelector,
    breakers: Arc<CircuitBreakerRegistry>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    metrics: Option<GatewayMetrics>,
    call_settings: BTreeMap<ProviderKind, CallSettings>,
    default_timeout: Duration,
    default_max_retries: u32,
}

impl std::fmt::Debug for FallbackOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackOrchestrator")
            .field("order", &self.selector.order())
            .field("default_timeout", &self.default_timeout)
            .field("default_max_retries", &self.default_max_retries)
            .finish_non_exhaustive()
    }
}

impl FallbackOrchestrator {
    /// Create an orchestrator with default guards
    #[must_use]
    pub fn new(registry: ProviderRegistry, selector: ProviderSelector) -> Self {
        Self {
            registry,
            selector,
            breakers: Arc::new(CircuitBreakerRegistry::default()),
            limiter: Arc::new(RateLimiter::default()),
            retry: RetryPolicy::default(),
            metrics: None,
            call_settings: BTreeMap::new(),
            default_timeout: Duration::from_secs(30),
            default_max_retries: 0,
        }
    }

    /// Create an orchestrator wired from the gateway configuration
    #[must_use]
    pub fn from_config(config: &GatewayConfig, registry: ProviderRegistry) -> Self {
        let mut limits = RateLimiterConfig {
            window: config.rate_limit.window,
            caller_share_divisor: config.rate_limit.caller_share_divisor,
            ..Default::default()
        };
        let mut orchestrator = Self::new(registry, ProviderSelector::from_config(config))
            .with_circuit_breakers(Arc::new(CircuitBreakerRegistry::new(breaker_config(
                &config.circuit_breaker,
            ))))
            .with_retry_policy(RetryPolicy::new(retry_config(&config.retry)))
            .with_defaults(config.default_timeout, config.default_max_retries);

        for provider in config.enabled_providers() {
            if let Some(rate) = &provider.rate_limits {
                limits = limits.with_limit(provider.kind, rate.requests_per_minute);
            }
            orchestrator = orchestrator.with_call_settings(
                provider.kind,
                CallSettings {
                    timeout: provider.timeout,
                    max_retries: provider.max_retries,
                },
            );
        }
        orchestrator.with_rate_limiter(Arc::new(RateLimiter::new(limits)))
    }

    /// Use a shared breaker registry
    #[must_use]
    pub fn with_circuit_breakers(mut self, breakers: Arc<CircuitBreakerRegistry>) -> Self {
        self.breakers = breakers;
        self
    }

    /// Use a shared rate limiter
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Set the same-provider retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Record skips on these metrics
    #[must_use]
    pub fn with_metrics(mut self, metrics: GatewayMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Override timeout and retries for one provider
    #[must_use]
    pub fn with_call_settings(mut self, provider: ProviderKind, settings: CallSettings) -> Self {
        self.call_settings.insert(provider, settings);
        self
    }

    /// Fallback timeout and retries when neither request nor provider set them
    #[must_use]
    pub fn with_defaults(mut self, timeout: Duration, max_retries: u32) -> Self {
        self.default_timeout = timeout;
        self.default_max_retries = max_retries;
        self
    }

    /// Breaker registry
    #[must_use]
    pub fn circuit_breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    /// Rate limiter
    #[must_use]
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Adapter registry
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Providers that would be tried for an operation, in order
    #[must_use]
    pub fn candidates(
        &self,
        operation: OperationType,
        preferred: Option<ProviderKind>,
    ) -> Vec<ProviderKind> {
        self.selector.candidates(&self.registry, operation, preferred)
    }

    /// Deadline for a call: request, then provider, then gateway default
    #[must_use]
    pub fn timeout_for(&self, provider: ProviderKind, envelope: &RequestEnvelope) -> Duration {
        envelope
            .timeout
            .or_else(|| self.call_settings.get(&provider).and_then(|s| s.timeout))
            .unwrap_or(self.default_timeout)
    }

    fn max_retries_for(&self, provider: ProviderKind, envelope: &RequestEnvelope) -> u32 {
        envelope
            .max_retries
            .or_else(|| self.call_settings.get(&provider).and_then(|s| s.max_retries))
            .unwrap_or(self.default_max_retries)
    }

    fn skip(&self, provider: ProviderKind, reason: &str) {
        debug!(provider = %provider, reason = reason, "Skipping candidate");
        if let Some(metrics) = &self.metrics {
            metrics.record_skip(provider, reason);
        }
    }

    /// Run the operation against the candidate chain
    ///
    /// # Errors
    /// Returns the last provider error when every called candidate failed,
    /// `RateLimitExceeded` or `CircuitOpen` when every candidate was skipped,
    /// or a `Provider` error when no provider serves the operation
    pub async fn execute(
        &self,
        envelope: &RequestEnvelope,
        input: &OperationInput,
    ) -> GatewayResult<FallbackOutcome> {
        let operation = input.operation_type();
        let candidates = self.candidates(operation, envelope.preferred_provider);
        if candidates.is_empty() {
            warn!(operation = %operation, "No enabled provider supports operation");
            return Err(GatewayError::no_available_providers(operation));
        }

        let caller = envelope.caller_id.as_deref();
        let mut last_error: Option<GatewayError> = None;
        let mut last_skip: Option<GatewayError> = None;

        for (attempt, provider) in candidates.iter().copied().enumerate() {
            let Some(adapter) = self.registry.get(provider) else {
                continue;
            };

            match self.limiter.try_acquire(provider, caller) {
                RateLimitDecision::Allowed => {}
                RateLimitDecision::ProviderLimited => {
                    self.skip(provider, "rate_limit");
                    last_skip = Some(GatewayError::rate_limit(
                        Some(provider),
                        format!("{provider} request window is full"),
                    ));
                    continue;
                }
                RateLimitDecision::CallerLimited => {
                    self.skip(provider, "caller_rate_limit");
                    last_skip = Some(GatewayError::rate_limit(
                        Some(provider),
                        format!("Caller exceeded its share of the {provider} request window"),
                    ));
                    continue;
                }
            }

            let breaker = self.breakers.get(provider);
            if !breaker.allow() {
                self.skip(provider, "circuit_open");
                last_skip = Some(GatewayError::circuit_open(provider));
                continue;
            }

            let timeout = self.timeout_for(provider, envelope);
            let max_retries = self.max_retries_for(provider, envelope);
            let result = self
                .retry
                .execute(max_retries, || call_adapter(adapter.as_ref(), input, timeout))
                .instrument(provider_span!(provider, operation))
                .await;

            match result {
                Ok(result) => {
                    breaker.record_success();
                    let cost = estimate_cost(provider, operation, result.usage.as_ref());
                    if attempt > 0 {
                        info!(
                            provider = %provider,
                            operation = %operation,
                            attempt = attempt,
                            "Fallback provider succeeded"
                        );
                    }
                    return Ok(FallbackOutcome {
                        provider,
                        result,
                        cost,
                        attempts: attempt,
                    });
                }
                Err(error) => {
                    if error.is_provider_failure() {
                        breaker.record_failure();
                    } else {
                        breaker.release_half_open();
                    }
                    warn!(
                        provider = %provider,
                        operation = %operation,
                        error = %error,
                        "Provider attempt failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        Err(last_error
            .or(last_skip)
            .unwrap_or_else(|| GatewayError::no_available_providers(operation)))
    }
}

/// One adapter call bounded by the deadline
async fn call_adapter(
    adapter: &dyn ProviderAdapter,
    input: &OperationInput,
    timeout: Duration,
) -> GatewayResult<ProviderRawResult> {
    tokio::time::timeout(timeout, adapter.execute(input, timeout))
        .await
        .map_err(|_| GatewayError::timeout(adapter.kind(), timeout))?
}

/// Breaker parameters from configuration
#[must_use]
pub fn breaker_config(settings: &CircuitBreakerSettings) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        enabled: settings.enabled,
        failure_threshold: settings.failure_threshold,
        rolling_window: settings.rolling_window,
        buckets: settings.buckets,
        reset_timeout: settings.reset_timeout,
        min_requests: settings.min_requests,
    }
}

/// Retry parameters from configuration
#[must_use]
pub fn retry_config(settings: &RetrySettings) -> RetryConfig {
    RetryConfig {
        base_delay: settings.base_delay,
        max_delay: settings.max_delay,
        multiplier: settings.multiplier,
        jitter: settings.jitter,
    }
}
