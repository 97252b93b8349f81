//! Circuit breaker pattern implementation.
//!
//! Each provider gets a breaker that tracks outcomes in a rolling window of
//! time buckets. When the failure percentage over the window reaches the
//! threshold the breaker opens and rejects calls. After the reset timeout a
//! single probe call is let through; its outcome closes or re-opens the
//! breaker.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use gateway_core::ProviderKind;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum CircuitState {
    /// Circuit is closed, requests flow normally
    Closed = 0,
    /// Circuit is open, requests are rejected
    Open = 1,
    /// Circuit is half-open, one probe is testing the provider
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Open,
            2 => Self::HalfOpen,
            _ => Self::Closed,
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// When false the breaker always allows and never trips
    pub enabled: bool,
    /// Failure percentage (1-100) over the window that opens the circuit
    pub failure_threshold: u8,
    /// Rolling window length
    pub rolling_window: Duration,
    /// Number of buckets in the window
    pub buckets: u32,
    /// Time to wait in open state before probing
    pub reset_timeout: Duration,
    /// Minimum calls in the window before the failure rate is considered
    pub min_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 50,
            rolling_window: Duration::from_secs(60),
            buckets: 10,
            reset_timeout: Duration::from_secs(30),
            min_requests: 4,
        }
    }
}

impl CircuitBreakerConfig {
    fn bucket_width(&self) -> Duration {
        self.rolling_window / self.buckets.max(1)
    }
}

#[derive(Debug)]
struct Bucket {
    started: Instant,
    successes: u32,
    failures: u32,
}

#[derive(Debug)]
struct Window {
    buckets: VecDeque<Bucket>,
    consecutive_failures: u32,
    changed_at: Instant,
    changed_at_wall: DateTime<Utc>,
    probe_started: Option<Instant>,
}

impl Window {
    fn new() -> Self {
        Self {
            buckets: VecDeque::new(),
            consecutive_failures: 0,
            changed_at: Instant::now(),
            changed_at_wall: Utc::now(),
            probe_started: None,
        }
    }

    fn evict(&mut self, now: Instant, rolling_window: Duration) {
        while self
            .buckets
            .front()
            .is_some_and(|b| now.duration_since(b.started) >= rolling_window)
        {
            self.buckets.pop_front();
        }
    }

    fn current(&mut self, now: Instant, config: &CircuitBreakerConfig) -> &mut Bucket {
        self.evict(now, config.rolling_window);
        let width = config.bucket_width();
        let fresh = self
            .buckets
            .back()
            .map_or(true, |b| now.duration_since(b.started) >= width);
        if fresh {
            self.buckets.push_back(Bucket {
                started: now,
                successes: 0,
                failures: 0,
            });
        }
        // A bucket was pushed above if none existed.
        let last = self.buckets.len() - 1;
        &mut self.buckets[last]
    }

    fn totals(&self) -> (u32, u32) {
        self.buckets.iter().fold((0, 0), |(requests, failures), b| {
            (requests + b.successes + b.failures, failures + b.failures)
        })
    }
}

/// Point-in-time view of a breaker, safe to expose through statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    /// Current state
    pub state: CircuitState,
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// Calls recorded in the rolling window
    pub window_requests: u32,
    /// Failures recorded in the rolling window
    pub window_failures: u32,
    /// Failure percentage over the rolling window
    pub window_failure_rate: f64,
    /// Time of the last state transition
    pub last_state_change_at: DateTime<Utc>,
}

/// Circuit breaker for a single provider
pub struct CircuitBreaker {
    /// Provider guarded by this breaker
    provider: ProviderKind,
    /// Configuration
    config: CircuitBreakerConfig,
    /// Current state (atomic for lock-free reads)
    state: AtomicU8,
    /// Rolling window and transition bookkeeping
    window: Mutex<Window>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("provider", &self.provider)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    #[must_use]
    pub fn new(provider: ProviderKind, config: CircuitBreakerConfig) -> Self {
        Self {
            provider,
            config,
            state: AtomicU8::new(CircuitState::Closed as u8),
            window: Mutex::new(Window::new()),
        }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults(provider: ProviderKind) -> Self {
        Self::new(provider, CircuitBreakerConfig::default())
    }

    /// Provider guarded by this breaker
    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Get the current state
    #[must_use]
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// Whether a call may be made now.
    ///
    /// In open state this returns false until the reset timeout has elapsed
    /// since the circuit opened; the first caller after that becomes the
    /// half-open probe and every other caller is rejected until the probe
    /// reports back.
    pub fn allow(&self) -> bool {
        if !self.config.enabled || self.state() == CircuitState::Closed {
            return true;
        }

        let now = Instant::now();
        let mut window = self.window.lock();
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if now.duration_since(window.changed_at) < self.config.reset_timeout {
                    return false;
                }
                self.transition(&mut window, CircuitState::HalfOpen, now);
                window.probe_started = Some(now);
                info!(provider = %self.provider, "Circuit breaker half-open, probing");
                true
            }
            CircuitState::HalfOpen => match window.probe_started {
                // A probe that never reported back is abandoned after one reset period.
                Some(started) if now.duration_since(started) < self.config.reset_timeout => false,
                _ => {
                    window.probe_started = Some(now);
                    debug!(provider = %self.provider, "Circuit breaker re-issuing stale probe");
                    true
                }
            },
        }
    }

    /// Record a successful call
    pub fn record_success(&self) {
        if !self.config.enabled {
            return;
        }
        let now = Instant::now();
        let mut window = self.window.lock();
        window.current(now, &self.config).successes += 1;
        window.consecutive_failures = 0;

        if self.state() == CircuitState::HalfOpen {
            window.buckets.clear();
            window.probe_started = None;
            self.transition(&mut window, CircuitState::Closed, now);
            info!(provider = %self.provider, "Circuit breaker closed");
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        if !self.config.enabled {
            return;
        }
        let now = Instant::now();
        let mut window = self.window.lock();
        window.current(now, &self.config).failures += 1;
        window.consecutive_failures += 1;

        match self.state() {
            CircuitState::Closed => {
                let (requests, failures) = window.totals();
                if requests < self.config.min_requests {
                    return;
                }
                let rate = f64::from(failures) * 100.0 / f64::from(requests);
                if rate >= f64::from(self.config.failure_threshold) {
                    self.transition(&mut window, CircuitState::Open, now);
                    warn!(
                        provider = %self.provider,
                        failures = failures,
                        requests = requests,
                        failure_rate = rate,
                        "Circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                window.probe_started = None;
                self.transition(&mut window, CircuitState::Open, now);
                warn!(provider = %self.provider, "Circuit breaker probe failed, reopening");
            }
            // Late result from a call that started before the circuit opened.
            CircuitState::Open => {}
        }
    }

    /// Give back a half-open trial call whose outcome says nothing about provider health.
    ///
    /// The next `allow()` call becomes the trial instead of waiting out
    /// another reset period. No-op in any other state.
    pub fn release_half_open(&self) {
        if !self.config.enabled {
            return;
        }
        let mut window = self.window.lock();
        if self.state() == CircuitState::HalfOpen && window.probe_started.take().is_some() {
            debug!(provider = %self.provider, "Circuit breaker trial call released");
        }
    }

    fn transition(&self, window: &mut Window, to: CircuitState, now: Instant) {
        self.state.store(to as u8, Ordering::Release);
        window.changed_at = now;
        window.changed_at_wall = Utc::now();
    }

    /// Reset the circuit breaker to closed state
    pub fn reset(&self) {
        let mut window = self.window.lock();
        *window = Window::new();
        self.state.store(CircuitState::Closed as u8, Ordering::Release);
    }

    /// Force the circuit open (for testing or manual intervention)
    pub fn force_open(&self) {
        let mut window = self.window.lock();
        window.probe_started = None;
        self.transition(&mut window, CircuitState::Open, Instant::now());
    }

    /// Current statistics
    #[must_use]
    pub fn snapshot(&self) -> CircuitSnapshot {
        let mut window = self.window.lock();
        window.evict(Instant::now(), self.config.rolling_window);
        let (requests, failures) = window.totals();
        let rate = if requests == 0 {
            0.0
        } else {
            f64::from(failures) * 100.0 / f64::from(requests)
        };
        CircuitSnapshot {
            state: self.state(),
            consecutive_failures: window.consecutive_failures,
            window_requests: requests,
            window_failures: failures,
            window_failure_rate: rate,
            last_state_change_at: window.changed_at_wall,
        }
    }
}

/// Lazily created breakers, one per provider
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: DashMap<ProviderKind, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    /// Create a registry applying one configuration to every provider
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    /// Breaker for a provider, created on first use
    pub fn get(&self, provider: ProviderKind) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(provider)
            .or_insert_with(|| Arc::new(CircuitBreaker::new(provider, self.config.clone())))
            .clone()
    }

    /// Snapshot of every breaker created so far
    #[must_use]
    pub fn snapshots(&self) -> BTreeMap<ProviderKind, CircuitSnapshot> {
        self.breakers
            .iter()
            .map(|entry| (*entry.key(), entry.value().snapshot()))
            .collect()
    }
}
