//! Loading, environment overlay and validation.

use crate::config::GatewayConfig;
use crate::error::ConfigError;
use gateway_core::ProviderKind;
use secrecy::SecretString;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};
use validator::Validate;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "AI_GATEWAY";

impl GatewayConfig {
    /// Load from a `.yaml`, `.yml` or `.toml` file, apply environment
    /// overrides, and validate.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed or validated
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut config = match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&contents)?,
            "toml" => Self::from_toml_str(&contents)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate_all()?;

        info!(
            path = %path.display(),
            providers = config.enabled_providers().count(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parse YAML without validating
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on malformed input
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Parse TOML without validating
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on malformed input
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Overlay values from the environment.
    ///
    /// `lookup` resolves a variable name; pass `|k| std::env::var(k).ok()`
    /// for the process environment. Provider keys only fill credentials that
    /// the file left empty.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for provider in &mut self.providers {
            let prefix = env_provider_prefix(provider.kind);
            if provider.api_key.is_none() {
                if let Some(key) = lookup(&format!("{prefix}_API_KEY")) {
                    debug!(provider = %provider.kind, "API key taken from environment");
                    provider.api_key = Some(SecretString::new(key));
                }
            }
            if provider.secret_key.is_none() {
                if let Some(key) = lookup(&format!("{prefix}_SECRET_KEY")) {
                    provider.secret_key = Some(SecretString::new(key));
                }
            }
        }

        if let Some(budget) = lookup(&format!("{ENV_PREFIX}_MONTHLY_BUDGET"))
            .and_then(|v| v.parse::<f64>().ok())
        {
            self.monthly_budget = Some(budget);
        }
        if let Some(url) = lookup(&format!("{ENV_PREFIX}_REDIS_URL")) {
            self.cache.redis_url = Some(url);
        }
        if let Some(level) = lookup(&format!("{ENV_PREFIX}_LOG_LEVEL")) {
            self.logging.level = level;
        }
    }

    /// Field-level and cross-field validation.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` describing the first problem found
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if self.enabled_providers().next().is_none() {
            return Err(ConfigError::Invalid(
                "At least one AI provider must be enabled".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.kind) {
                return Err(ConfigError::Invalid(format!(
                    "provider {} is configured more than once",
                    provider.kind
                )));
            }
            if provider.enabled && provider.endpoint().is_none() {
                return Err(ConfigError::Invalid(format!(
                    "provider {} requires base_url",
                    provider.kind
                )));
            }
        }

        let window_ms = self.circuit_breaker.rolling_window.as_millis();
        let buckets = u128::from(self.circuit_breaker.buckets);
        if window_ms == 0 || window_ms % buckets != 0 {
            return Err(ConfigError::Invalid(format!(
                "circuit_breaker.rolling_window ({window_ms}ms) must divide evenly into {buckets} buckets"
            )));
        }
        if self.rate_limit.window.is_zero() {
            return Err(ConfigError::Invalid(
                "rate_limit.window must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_provider_prefix(kind: ProviderKind) -> String {
    format!(
        "{ENV_PREFIX}_{}",
        kind.as_str().replace('-', "_").to_ascii_uppercase()
    )
}
