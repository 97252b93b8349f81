//! Configuration types.

use gateway_core::{OperationType, ProviderKind};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use validator::Validate;

/// Top-level gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GatewayConfig {
    /// Providers in fallback order
    #[serde(default)]
    #[validate(nested)]
    pub providers: Vec<ProviderConfig>,

    /// Result cache
    #[serde(default)]
    #[validate(nested)]
    pub cache: CacheConfig,

    /// Per-provider circuit breakers
    #[serde(default)]
    #[validate(nested)]
    pub circuit_breaker: CircuitBreakerSettings,

    /// Rate limit windows
    #[serde(default)]
    #[validate(nested)]
    pub rate_limit: RateLimitSettings,

    /// Same-provider retry backoff
    #[serde(default)]
    #[validate(nested)]
    pub retry: RetrySettings,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Monthly spend ceiling in USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub monthly_budget: Option<f64>,

    /// Provider call deadline when neither request nor provider sets one
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub default_timeout: Duration,

    /// Same-provider retries when neither request nor provider sets them
    #[serde(default)]
    pub default_max_retries: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            cache: CacheConfig::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            rate_limit: RateLimitSettings::default(),
            retry: RetrySettings::default(),
            logging: LoggingConfig::default(),
            monthly_budget: None,
            default_timeout: default_timeout(),
            default_max_retries: 0,
        }
    }
}

impl GatewayConfig {
    /// Add a provider at the end of the fallback order
    #[must_use]
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.providers.push(provider);
        self
    }

    /// Set the monthly budget
    #[must_use]
    pub fn with_monthly_budget(mut self, budget: f64) -> Self {
        self.monthly_budget = Some(budget);
        self
    }

    /// Set the cache configuration
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Set the circuit breaker configuration
    #[must_use]
    pub fn with_circuit_breaker(mut self, circuit_breaker: CircuitBreakerSettings) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    /// Enabled providers in configuration order
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.enabled)
    }

    /// Configuration for one provider
    #[must_use]
    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.kind == kind)
    }
}

/// One provider entry
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProviderConfig {
    /// Provider
    pub kind: ProviderKind,

    /// Whether the provider participates in routing
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API key (access key id for AWS)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Secret access key (AWS only)
    #[serde(default, skip_serializing)]
    pub secret_key: Option<SecretString>,

    /// Session token for temporary credentials (AWS only)
    #[serde(default, skip_serializing)]
    pub session_token: Option<SecretString>,

    /// Endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub base_url: Option<String>,

    /// Organization header (OpenAI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    /// Region (AWS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// API version (Azure `api-version`, Anthropic `anthropic-version`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Model used per operation when the request names none
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub models: BTreeMap<OperationType, String>,

    /// Call deadline override
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Same-provider retry override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Request ceiling; unlimited when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub rate_limits: Option<ProviderRateLimits>,
}

impl ProviderConfig {
    /// Enabled provider with no credentials and default endpoint
    #[must_use]
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            enabled: true,
            api_key: None,
            secret_key: None,
            session_token: None,
            base_url: None,
            organization_id: None,
            region: None,
            api_version: None,
            models: BTreeMap::new(),
            timeout: None,
            max_retries: None,
            rate_limits: None,
        }
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key.into()));
        self
    }

    /// Set the AWS secret key
    #[must_use]
    pub fn with_secret_key(mut self, key: impl Into<String>) -> Self {
        self.secret_key = Some(SecretString::new(key.into()));
        self
    }

    /// Set the endpoint
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the region
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the per-minute request ceiling
    #[must_use]
    pub fn with_requests_per_minute(mut self, requests_per_minute: u32) -> Self {
        self.rate_limits = Some(ProviderRateLimits {
            requests_per_minute,
            tokens_per_minute: None,
        });
        self
    }

    /// Set the call deadline
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable the provider
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// AWS region, defaulting to us-east-1
    #[must_use]
    pub fn region_or_default(&self) -> &str {
        self.region.as_deref().unwrap_or("us-east-1")
    }

    /// Configured endpoint or the provider's public default.
    ///
    /// Azure has no public default; `None` is returned when it is unset.
    #[must_use]
    pub fn endpoint(&self) -> Option<String> {
        if let Some(url) = &self.base_url {
            return Some(url.trim_end_matches('/').to_string());
        }
        let url = match self.kind {
            ProviderKind::OpenAi => "https://api.openai.com/v1".to_string(),
            ProviderKind::Anthropic => "https://api.anthropic.com/v1".to_string(),
            ProviderKind::Google => "https://generativelanguage.googleapis.com/v1".to_string(),
            ProviderKind::Cohere => "https://api.cohere.ai/v1".to_string(),
            ProviderKind::Stability => "https://api.stability.ai/v1".to_string(),
            ProviderKind::AwsRekognition => {
                format!("https://rekognition.{}.amazonaws.com", self.region_or_default())
            }
            ProviderKind::AzureOpenAi => return None,
        };
        Some(url)
    }

    /// Model configured for an operation
    #[must_use]
    pub fn model_for(&self, operation: OperationType) -> Option<&str> {
        self.models.get(&operation).map(String::as_str)
    }
}

/// Provider request ceilings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProviderRateLimits {
    /// Requests per window across all callers
    #[validate(range(min = 1))]
    pub requests_per_minute: u32,

    /// Token ceiling (informational; not enforced by the gateway)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_per_minute: Option<u32>,
}

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CacheConfig {
    /// Enable caching
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// TTL when the request does not override it
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub default_ttl: Duration,

    /// Redis URL; in-memory cache when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub redis_url: Option<String>,

    /// Entry ceiling for the in-memory cache
    #[serde(default = "default_max_entries")]
    #[validate(range(min = 1))]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: default_cache_ttl(),
            redis_url: None,
            max_entries: default_max_entries(),
        }
    }
}

/// Circuit breaker configuration applied to every provider
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CircuitBreakerSettings {
    /// Enable breakers; when disabled every call is allowed
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Failure percentage over the rolling window that opens the breaker
    #[serde(default = "default_failure_threshold")]
    #[validate(range(min = 1, max = 100))]
    pub failure_threshold: u8,

    /// Rolling window length
    #[serde(default = "default_rolling_window", with = "humantime_serde")]
    pub rolling_window: Duration,

    /// Number of buckets the rolling window is divided into
    #[serde(default = "default_buckets")]
    #[validate(range(min = 1, max = 1000))]
    pub buckets: u32,

    /// Time spent open before a probe is allowed
    #[serde(default = "default_reset_timeout", with = "humantime_serde")]
    pub reset_timeout: Duration,

    /// Calls required in the window before the failure rate is evaluated
    #[serde(default = "default_min_requests")]
    #[validate(range(min = 1))]
    pub min_requests: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: default_failure_threshold(),
            rolling_window: default_rolling_window(),
            buckets: default_buckets(),
            reset_timeout: default_reset_timeout(),
            min_requests: default_min_requests(),
        }
    }
}

/// Rate limit window configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateLimitSettings {
    /// Fixed window length
    #[serde(default = "default_rate_window", with = "humantime_serde")]
    pub window: Duration,

    /// A caller may use at most `limit / caller_share_divisor` of a provider's window
    #[serde(default = "default_caller_share_divisor")]
    #[validate(range(min = 1))]
    pub caller_share_divisor: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window: default_rate_window(),
            caller_share_divisor: default_caller_share_divisor(),
        }
    }
}

/// Same-provider retry backoff
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RetrySettings {
    /// First retry delay
    #[serde(default = "default_base_delay", with = "humantime_serde")]
    pub base_delay: Duration,

    /// Delay ceiling
    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,

    /// Backoff multiplier
    #[serde(default = "default_multiplier")]
    #[validate(range(min = 1.0))]
    pub multiplier: f64,

    /// Randomize delays
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            multiplier: default_multiplier(),
            jitter: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `gateway_routing=debug,info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,

    /// Log each provider request at debug level
    #[serde(default = "default_true")]
    pub log_requests: bool,

    /// Keep raw provider responses on results and log response status
    #[serde(default)]
    pub log_responses: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            log_requests: true,
            log_responses: false,
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_cache_ttl() -> Duration {
    Duration::from_secs(3600)
}

const fn default_max_entries() -> usize {
    10_000
}

const fn default_failure_threshold() -> u8 {
    50
}

const fn default_rolling_window() -> Duration {
    Duration::from_secs(60)
}

const fn default_buckets() -> u32 {
    10
}

const fn default_reset_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_min_requests() -> u32 {
    4
}

const fn default_rate_window() -> Duration {
    Duration::from_secs(60)
}

const fn default_caller_share_divisor() -> u32 {
    3
}

const fn default_base_delay() -> Duration {
    Duration::from_millis(200)
}

const fn default_max_delay() -> Duration {
    Duration::from_secs(5)
}

const fn default_multiplier() -> f64 {
    2.0
}

fn default_log_level() -> String {
    "info".to_string()
}
