//! TTL cache with per-entry expiry and namespace invalidation.
//!
//! [`ExpiringCache`] is the one cache implementation behind every named
//! instance in [`CacheRegistry`](super::CacheRegistry). It wraps moka's
//! sync cache for bounded capacity and thread safety, but ages entries
//! itself: each [`CacheEntry`] records when it was stored and how long it
//! may live, and every read re-checks validity against the injected
//! [`Clock`]. Different entries in the same cache can therefore carry
//! different TTLs, which moka's per-cache `time_to_live` cannot express.
//!
//! # Lazy expiry
//!
//! Expiry is a read-path side effect, split into two auditable steps:
//! [`peek`](ExpiringCache::peek) reports `(value, is_valid)` without
//! touching anything, and [`get`](ExpiringCache::get) evicts on a stale
//! peek before reporting a miss. An entry whose TTL has elapsed is
//! indistinguishable from an absent one to readers; if nothing ever reads
//! it again, the periodic [`cleanup`](ExpiringCache::cleanup) sweep
//! reclaims it.
//!
//! # Failure semantics
//!
//! No operation here returns an error. The cache is an optimization, not
//! a source of truth — callers must be able to recompute any value they
//! ask for, and anything unexpected inside the cache degrades to a miss.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::Result;
use crate::clock::Clock;
use crate::telemetry;

use super::key::namespace;

/// Configuration for a single cache instance.
///
/// ```rust
/// # use wayfarer::cache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(5_000)
///     .default_ttl(Duration::from_secs(24 * 3600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 10,000.
    pub max_entries: u64,
    /// TTL applied by [`ExpiringCache::set`] when the caller does not
    /// supply one. Default: 1 hour.
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            default_ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the TTL used when `set` is called without an explicit one.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

/// A stored value plus the bookkeeping needed to age it.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// An entry is valid iff `now - stored_at <= ttl`.
    fn is_valid(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) <= self.ttl
    }
}

/// Thread-safe key→value cache with per-entry TTL and namespace
/// invalidation.
///
/// Keys are composite strings built by [`cache_key`](super::cache_key);
/// values are opaque to the cache. One instance owns one keyspace — the
/// registry keeps instances per upstream resource so cross-resource
/// collisions are structurally impossible.
pub struct ExpiringCache<V> {
    name: String,
    entries: moka::sync::Cache<String, CacheEntry<V>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone + Send + Sync + 'static> ExpiringCache<V> {
    /// Create a cache instance.
    ///
    /// `name` labels this instance in metrics and logs.
    pub fn new(name: impl Into<String>, config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let entries = moka::sync::Cache::builder()
            .max_capacity(config.max_entries)
            .support_invalidation_closures()
            .build();
        Self {
            name: name.into(),
            entries,
            default_ttl: config.default_ttl,
            clock,
        }
    }

    /// The instance name used in metrics and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inspect an entry without evicting it.
    ///
    /// Returns the stored value together with whether it is still valid
    /// at the current clock reading, or `None` if no entry exists. Emits
    /// no metrics and performs no eviction — this is the read half of the
    /// lazy-expiry pair; [`get`](Self::get) composes it with
    /// [`evict`](Self::evict).
    pub fn peek(&self, key: &str) -> Option<(V, bool)> {
        let entry = self.entries.get(key)?;
        let valid = entry.is_valid(self.clock.now());
        Some((entry.value, valid))
    }

    /// Look up a value, treating expired entries as absent.
    ///
    /// A stale entry is deleted as a side effect of the read. Emits
    /// hit/miss metrics; the stale-read deletion also counts as an
    /// eviction.
    pub fn get(&self, key: &str) -> Option<V> {
        match self.peek(key) {
            Some((value, true)) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "cache" => self.name.clone())
                    .increment(1);
                Some(value)
            }
            Some((_, false)) => {
                self.evict(key);
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "cache" => self.name.clone())
                    .increment(1);
                None
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "cache" => self.name.clone())
                    .increment(1);
                None
            }
        }
    }

    /// Insert or overwrite a value under the cache's default TTL.
    pub fn set(&self, key: &str, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert or overwrite a value with an entry-specific TTL.
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        self.entries.insert(
            key.to_owned(),
            CacheEntry {
                value,
                stored_at: self.clock.now(),
                ttl,
            },
        );
    }

    /// Delete a single entry. The eviction half of the lazy-expiry pair.
    pub fn evict(&self, key: &str) {
        self.entries.invalidate(key);
        metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "cache" => self.name.clone())
            .increment(1);
    }

    /// Delete every entry whose namespace equals `prefix`, regardless of
    /// parameter suffix.
    ///
    /// Called after a write to underlying storage that would otherwise be
    /// masked by a stale list entry (e.g. creating a group must drop the
    /// cached groups list). Matches the namespace component exactly:
    /// invalidating `"groups:list"` does not touch `"groups:list:v2"`.
    pub fn invalidate(&self, prefix: &str) {
        let prefix = prefix.to_owned();
        if let Err(e) = self
            .entries
            .invalidate_entries_if(move |key, _| namespace(key) == prefix)
        {
            // Fail open: a failed invalidation degrades to staleness, and
            // the entries still age out via their TTLs.
            warn!(cache = %self.name, error = %e, "prefix invalidation failed");
        }
    }

    /// Proactive full-scan eviction of expired entries.
    ///
    /// Run on a fixed interval (see [`spawn_cleanup`]) to bound memory for
    /// entries nothing reads again. The scan is predicate-based and does
    /// not hold a lock for its duration; request traffic keeps flowing
    /// while it runs.
    pub fn cleanup(&self) {
        let now = self.clock.now();
        if let Err(e) = self
            .entries
            .invalidate_entries_if(move |_, entry| !entry.is_valid(now))
        {
            warn!(cache = %self.name, error = %e, "cleanup sweep failed");
        }
        self.entries.run_pending_tasks();
        debug!(cache = %self.name, "cleanup sweep completed");
    }

    /// Read-through helper: return the cached value or compute, store,
    /// and return it.
    ///
    /// On a miss the computed value is stored under the default TTL. A
    /// failed computation caches nothing and propagates the error. Two
    /// concurrent misses for the same key may both compute; the second
    /// write wins, which is harmless for memoized reads.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = compute().await?;
        self.set(key, value.clone());
        Ok(value)
    }

    /// Number of entries currently in the cache (post-maintenance).
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

/// Run [`ExpiringCache::cleanup`] on a fixed interval.
///
/// Deterministic replacement for trigger-on-request sweeping: with a real
/// scheduler available there is no reason to gate reclamation on traffic.
/// The task runs until the handle is aborted or the runtime shuts down.
pub fn spawn_cleanup<V: Clone + Send + Sync + 'static>(
    cache: Arc<ExpiringCache<V>>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await; // first tick completes immediately
        loop {
            interval.tick().await;
            cache.cleanup();
        }
    })
}
