//! Fixed-window rate limiting.
//!
//! Two counters guard every call: one per provider shared by all callers,
//! and one per (provider, caller) capped at a fraction of the provider
//! limit so a single caller cannot starve the others. Windows reset at
//! their boundary rather than sliding.

use dashmap::DashMap;
use gateway_core::ProviderKind;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Window length
    pub window: Duration,
    /// Per-caller cap is `limit / caller_share_divisor`, at least one
    pub caller_share_divisor: u32,
    /// Requests per window for each limited provider
    pub limits: HashMap<ProviderKind, u32>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            caller_share_divisor: 3,
            limits: HashMap::new(),
        }
    }
}

impl RateLimiterConfig {
    /// Set a provider's per-window limit
    #[must_use]
    pub fn with_limit(mut self, provider: ProviderKind, requests: u32) -> Self {
        self.limits.insert(provider, requests);
        self
    }
}

/// Outcome of an acquire attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Both counters had room and were incremented
    Allowed,
    /// The provider's shared window is full
    ProviderLimited,
    /// The caller's share of the provider window is used up
    CallerLimited,
}

impl RateLimitDecision {
    /// Whether the call may proceed
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

impl Window {
    fn new(now: Instant) -> Self {
        Self {
            started: now,
            count: 0,
        }
    }

    /// Start a new window once the current one has run its length
    fn roll(&mut self, now: Instant, length: Duration) -> bool {
        let expired = self.is_expired(now, length);
        if expired {
            self.started = now;
            self.count = 0;
        }
        expired
    }

    fn is_expired(&self, now: Instant, length: Duration) -> bool {
        now.duration_since(self.started) >= length
    }
}

/// Per-provider and per-caller fixed-window limiter
#[derive(Debug, Default)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    providers: DashMap<ProviderKind, Window>,
    callers: DashMap<(ProviderKind, String), Window>,
}

impl RateLimiter {
    /// Create a limiter
    #[must_use]
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            providers: DashMap::new(),
            callers: DashMap::new(),
        }
    }

    /// Configured per-window limit for a provider
    #[must_use]
    pub fn limit(&self, provider: ProviderKind) -> Option<u32> {
        self.config.limits.get(&provider).copied()
    }

    /// Per-window cap for any single caller of a provider
    #[must_use]
    pub fn caller_limit(&self, provider: ProviderKind) -> Option<u32> {
        self.limit(provider)
            .map(|limit| (limit / self.config.caller_share_divisor.max(1)).max(1))
    }

    /// Try to take one slot for `provider`, and for `caller` when given.
    ///
    /// Both counters are checked and incremented under their entry locks,
    /// always provider first, so a rejected caller never consumes provider
    /// quota and concurrent callers never lose an increment.
    pub fn try_acquire(&self, provider: ProviderKind, caller: Option<&str>) -> RateLimitDecision {
        let Some(limit) = self.limit(provider) else {
            return RateLimitDecision::Allowed;
        };
        let now = Instant::now();
        let length = self.config.window;

        let mut global = self
            .providers
            .entry(provider)
            .or_insert_with(|| Window::new(now));
        if global.roll(now, length) {
            // Caller windows are only dropped here, once per provider window.
            self.callers
                .retain(|(p, _), window| *p != provider || !window.is_expired(now, length));
        }
        if global.count >= limit {
            warn!(provider = %provider, limit = limit, "Provider rate limit exceeded");
            return RateLimitDecision::ProviderLimited;
        }

        if let Some(caller) = caller {
            let caller_limit = (limit / self.config.caller_share_divisor.max(1)).max(1);
            let mut window = self
                .callers
                .entry((provider, caller.to_string()))
                .or_insert_with(|| Window::new(now));
            window.roll(now, length);
            if window.count >= caller_limit {
                warn!(
                    provider = %provider,
                    caller = %caller,
                    limit = caller_limit,
                    "Caller rate limit exceeded"
                );
                return RateLimitDecision::CallerLimited;
            }
            window.count += 1;
        }

        global.count += 1;
        RateLimitDecision::Allowed
    }

    /// Requests counted in the provider's current window
    #[must_use]
    pub fn current_count(&self, provider: ProviderKind) -> u32 {
        let now = Instant::now();
        self.providers.get(&provider).map_or(0, |w| {
            if w.is_expired(now, self.config.window) {
                0
            } else {
                w.count
            }
        })
    }

    /// Number of per-caller windows currently held
    #[must_use]
    pub fn tracked_callers(&self) -> usize {
        self.callers.len()
    }
}
