//! Named cache instances, one per upstream resource.
//!
//! Each cache in [`CacheRegistry`] wraps a different expensive upstream —
//! AI generation, geocoding, place lookups, list reads from the database —
//! and carries a default TTL matched to how fast that resource goes stale.
//! Instances are fully independent: a key written to one can never be read
//! from another, so namespace discipline only matters *within* a resource.
//!
//! Handlers consult the relevant cache before doing expensive work and
//! write back after a successful fetch. Any write to underlying storage
//! that could leave a list cache stale must be followed by
//! [`invalidate`](super::ExpiringCache::invalidate) on the affected list
//! cache(s) — best-effort, in the same logical transaction as the write.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::clock::Clock;

use super::store::{CacheConfig, ExpiringCache};

/// Per-instance TTL policy and shared capacity for the registry.
///
/// Defaults reflect the volatility of each resource: addresses essentially
/// never move (24 h), venue metadata changes rarely (30 d), AI answers for
/// identical prompts are stable short-term (1 h), and list caches must
/// reflect recent writes quickly (2 min).
///
/// ```rust
/// # use wayfarer::cache::RegistryConfig;
/// # use std::time::Duration;
/// let config = RegistryConfig::new()
///     .max_entries(20_000)
///     .geocoding_ttl(Duration::from_secs(12 * 3600));
/// ```
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum entries per cache instance. Default: 10,000.
    pub max_entries: u64,
    /// AI-response cache TTL. Default: 1 hour.
    pub ai_responses_ttl: Duration,
    /// Geocode cache TTL. Default: 24 hours.
    pub geocoding_ttl: Duration,
    /// Place-details cache TTL. Default: 30 days.
    pub place_details_ttl: Duration,
    /// Destination-locations cache TTL. Default: 7 days.
    pub destination_locations_ttl: Duration,
    /// Groups-list cache TTL. Default: 2 minutes.
    pub group_lists_ttl: Duration,
    /// Shared-itineraries-list cache TTL. Default: 2 minutes.
    pub shared_itineraries_ttl: Duration,
    /// User-profile cache TTL. Default: 5 minutes.
    pub user_profiles_ttl: Duration,
    /// Saved-items cache TTL. Default: 10 minutes.
    pub saved_items_ttl: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ai_responses_ttl: Duration::from_secs(3600),
            geocoding_ttl: Duration::from_secs(24 * 3600),
            place_details_ttl: Duration::from_secs(30 * 24 * 3600),
            destination_locations_ttl: Duration::from_secs(7 * 24 * 3600),
            group_lists_ttl: Duration::from_secs(120),
            shared_itineraries_ttl: Duration::from_secs(120),
            user_profiles_ttl: Duration::from_secs(300),
            saved_items_ttl: Duration::from_secs(600),
        }
    }
}

impl RegistryConfig {
    /// Create a config with the default TTL table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-instance entry cap.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the AI-response cache TTL.
    pub fn ai_responses_ttl(mut self, ttl: Duration) -> Self {
        self.ai_responses_ttl = ttl;
        self
    }

    /// Set the geocode cache TTL.
    pub fn geocoding_ttl(mut self, ttl: Duration) -> Self {
        self.geocoding_ttl = ttl;
        self
    }

    /// Set the place-details cache TTL.
    pub fn place_details_ttl(mut self, ttl: Duration) -> Self {
        self.place_details_ttl = ttl;
        self
    }

    /// Set the destination-locations cache TTL.
    pub fn destination_locations_ttl(mut self, ttl: Duration) -> Self {
        self.destination_locations_ttl = ttl;
        self
    }

    /// Set the groups-list cache TTL.
    pub fn group_lists_ttl(mut self, ttl: Duration) -> Self {
        self.group_lists_ttl = ttl;
        self
    }

    /// Set the shared-itineraries-list cache TTL.
    pub fn shared_itineraries_ttl(mut self, ttl: Duration) -> Self {
        self.shared_itineraries_ttl = ttl;
        self
    }

    /// Set the user-profile cache TTL.
    pub fn user_profiles_ttl(mut self, ttl: Duration) -> Self {
        self.user_profiles_ttl = ttl;
        self
    }

    /// Set the saved-items cache TTL.
    pub fn saved_items_ttl(mut self, ttl: Duration) -> Self {
        self.saved_items_ttl = ttl;
        self
    }

    fn cache(&self, ttl: Duration) -> CacheConfig {
        CacheConfig::new().max_entries(self.max_entries).default_ttl(ttl)
    }
}

/// The fixed set of named caches, created once at process start and shared
/// by every request handler.
///
/// Payloads are [`serde_json::Value`] — handlers exchange JSON with the
/// upstreams these caches memoize, and the cache treats the payload as
/// opaque either way.
pub struct CacheRegistry {
    /// Memoized AI generation responses, keyed on the canonical prompt.
    pub ai_responses: ExpiringCache<Value>,
    /// Address → coordinates lookups.
    pub geocoding: ExpiringCache<Value>,
    /// Venue metadata from the places upstream.
    pub place_details: ExpiringCache<Value>,
    /// Aggregate destination search results.
    pub destination_locations: ExpiringCache<Value>,
    /// Per-user groups listings; invalidated on group writes.
    pub group_lists: ExpiringCache<Value>,
    /// Shared-itinerary listings; invalidated on itinerary writes.
    pub shared_itineraries: ExpiringCache<Value>,
    /// User profile reads.
    pub user_profiles: ExpiringCache<Value>,
    /// Saved-items reads.
    pub saved_items: ExpiringCache<Value>,
}

impl CacheRegistry {
    /// Create all cache instances against one shared clock.
    pub fn new(config: &RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            ai_responses: ExpiringCache::new(
                "ai_responses",
                &config.cache(config.ai_responses_ttl),
                Arc::clone(&clock),
            ),
            geocoding: ExpiringCache::new(
                "geocoding",
                &config.cache(config.geocoding_ttl),
                Arc::clone(&clock),
            ),
            place_details: ExpiringCache::new(
                "place_details",
                &config.cache(config.place_details_ttl),
                Arc::clone(&clock),
            ),
            destination_locations: ExpiringCache::new(
                "destination_locations",
                &config.cache(config.destination_locations_ttl),
                Arc::clone(&clock),
            ),
            group_lists: ExpiringCache::new(
                "group_lists",
                &config.cache(config.group_lists_ttl),
                Arc::clone(&clock),
            ),
            shared_itineraries: ExpiringCache::new(
                "shared_itineraries",
                &config.cache(config.shared_itineraries_ttl),
                Arc::clone(&clock),
            ),
            user_profiles: ExpiringCache::new(
                "user_profiles",
                &config.cache(config.user_profiles_ttl),
                Arc::clone(&clock),
            ),
            saved_items: ExpiringCache::new("saved_items", &config.cache(config.saved_items_ttl), clock),
        }
    }

    /// Sweep expired entries out of every instance.
    pub fn cleanup_all(&self) {
        self.ai_responses.cleanup();
        self.geocoding.cleanup();
        self.place_details.cleanup();
        self.destination_locations.cleanup();
        self.group_lists.cleanup();
        self.shared_itineraries.cleanup();
        self.user_profiles.cleanup();
        self.saved_items.cleanup();
    }

    /// Run [`cleanup_all`](Self::cleanup_all) on a fixed interval.
    pub fn spawn_cleanup(registry: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                registry.cleanup_all();
            }
        })
    }
}
