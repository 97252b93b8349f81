//! Response cache backends and key derivation.
//!
//! Results are stored as serialized bytes under a key derived from the
//! operation and a canonical form of the request, so two requests that
//! differ only in volatile envelope fields share an entry.

use async_trait::async_trait;
use gateway_core::{GatewayError, GatewayResult, OperationType, RequestEnvelope};
use redis::aio::ConnectionManager;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

/// Prefix of every cache key
pub const KEY_PREFIX: &str = "ai-gateway";

/// Derive the cache key for a request.
///
/// The request is serialized to JSON, volatile envelope fields are removed,
/// and the remaining object (whose keys serialize in sorted order) is hashed.
///
/// # Errors
/// Returns a validation error if the request cannot be serialized
pub fn cache_key<T: Serialize>(operation: OperationType, request: &T) -> GatewayResult<String> {
    let mut value = serde_json::to_value(request).map_err(|e| {
        GatewayError::validation(
            format!("request is not serializable: {e}"),
            None,
            "invalid_request",
        )
    })?;
    if let Some(object) = value.as_object_mut() {
        for field in RequestEnvelope::VOLATILE_FIELDS {
            object.remove(*field);
        }
    }

    let canonical = value.to_string();
    let digest = hex::encode(Sha256::digest(canonical.as_bytes()));
    Ok(format!("{KEY_PREFIX}:{operation}:{digest}"))
}

/// Cache backend trait
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value, `None` on miss or expiry
    async fn get(&self, key: &str) -> GatewayResult<Option<Vec<u8>>>;

    /// Store a value with a time to live
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> GatewayResult<()>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

#[derive(Debug)]
struct MemoryEntry {
    data: Vec<u8>,
    expires_at: Instant,
    last_used: u64,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Entries plus a recency index; `recency` maps each entry's last-use tick to its key
#[derive(Debug, Default)]
struct LruState {
    entries: HashMap<String, MemoryEntry>,
    recency: BTreeMap<u64, String>,
    tick: u64,
}

impl LruState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn touch(&mut self, key: &str) {
        let tick = self.next_tick();
        if let Some(entry) = self.entries.get_mut(key) {
            let previous = std::mem::replace(&mut entry.last_used, tick);
            if let Some(key) = self.recency.remove(&previous) {
                self.recency.insert(tick, key);
            }
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.recency.remove(&entry.last_used);
        }
    }

    /// Drop least recently used entries until one more fits
    fn make_room(&mut self, max_entries: usize) {
        while self.entries.len() >= max_entries {
            let Some((_, key)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&key);
        }
    }
}

/// In-process LRU cache for single-instance deployments.
///
/// Expired entries are dropped when read or when they reach the
/// least-recently-used end.
#[derive(Debug, Clone)]
pub struct MemoryCacheStore {
    state: Arc<RwLock<LruState>>,
    max_entries: usize,
}

impl MemoryCacheStore {
    /// Create a store holding at most `max_entries` values
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(LruState::default())),
            max_entries: max_entries.max(1),
        }
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.state
            .read()
            .await
            .entries
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    /// Whether the store holds no live entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> GatewayResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut state = self.state.write().await;

        let data = match state.entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.is_expired(now) => None,
            Some(entry) => Some(entry.data.clone()),
        };
        match data {
            Some(data) => {
                state.touch(key);
                Ok(Some(data))
            }
            None => {
                state.remove(key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> GatewayResult<()> {
        let now = Instant::now();
        let mut state = self.state.write().await;
        state.remove(key);
        state.make_room(self.max_entries);

        let tick = state.next_tick();
        state.recency.insert(tick, key.to_string());
        state.entries.insert(
            key.to_string(),
            MemoryEntry {
                data: value,
                expires_at: now + ttl,
                last_used: tick,
            },
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Redis-backed cache shared between gateway instances
#[derive(Clone)]
pub struct RedisCacheStore {
    connection: ConnectionManager,
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore").finish_non_exhaustive()
    }
}

impl RedisCacheStore {
    /// Connect to Redis at `url`
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the server is unreachable
    pub async fn connect(url: &str) -> GatewayResult<Self> {
        let client = redis::Client::open(url).map_err(redis_error)?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(redis_error)?;
        info!("Connected to Redis cache");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> GatewayResult<Option<Vec<u8>>> {
        let mut connection = self.connection.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<Vec<u8>>>(&mut connection)
            .await
            .map_err(redis_error)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> GatewayResult<()> {
        let mut connection = self.connection.clone();
        let seconds = ttl.as_secs().max(1);
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query_async::<_, ()>(&mut connection)
            .await
            .map_err(redis_error)?;
        debug!(key = %key, ttl_secs = seconds, "Stored cache entry in Redis");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

fn redis_error(error: redis::RedisError) -> GatewayError {
    GatewayError::unknown(format!("redis cache error: {error}"))
}
