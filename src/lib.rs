//! Wayfarer - caching and quota-control core for the Wayfarer travel planner
//!
//! This crate is the shared layer between the web framework and the
//! expensive upstreams a travel-planning service leans on (AI itinerary
//! generation, geocoding, place lookups, database list reads). It does
//! three things, all in-process and all O(1) on the request path:
//!
//! - memoize upstream results with per-entry TTLs and namespace
//!   invalidation ([`cache`]);
//! - enforce request-size and fixed-window rate limits at the boundary,
//!   with self-describing response headers ([`limit`]);
//! - track spend against the AI vendor's quota and veto calls before
//!   they are made ([`usage`]).
//!
//! Everything is explicitly constructed and passed to handlers — create
//! the shared instances once at process start and hand out `Arc`s; reset
//! is for tests only. Nothing here survives a restart except the usage
//! counters, and those only within the same calendar day.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use wayfarer::cache::{CacheRegistry, RegistryConfig, cache_key};
//! use wayfarer::clock::SystemClock;
//! use wayfarer::limit::{FixedWindowLimiter, GatePolicy, RequestGate, RequestMeta};
//!
//! let clock = Arc::new(SystemClock);
//! let caches = CacheRegistry::new(&RegistryConfig::default(), clock.clone());
//! let gate = RequestGate::new(Arc::new(FixedWindowLimiter::new(clock)));
//!
//! // At the boundary: size check, rate check, headers.
//! let request = RequestMeta::new("GET", "/api/destinations");
//! let decision = gate.admit(
//!     &request,
//!     "destinations:search",
//!     Some("user-1"),
//!     &GatePolicy::default(),
//! );
//! assert!(decision.is_allowed());
//!
//! // Inside the handler: consult the cache before the expensive call.
//! let key = cache_key("destinations:search", &[("q", json!("lisbon"))]);
//! if caches.destination_locations.get(&key).is_none() {
//!     let result = json!({ "places": [] }); // expensive upstream call here
//!     caches.destination_locations.set(&key, result);
//! }
//! assert!(caches.destination_locations.get(&key).is_some());
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod limit;
pub mod telemetry;
pub mod upstream;
pub mod usage;

// Re-export main types at crate root
pub use error::{Result, WayfarerError};

pub use cache::{CacheConfig, CacheRegistry, ExpiringCache, RegistryConfig, cache_key};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CoreConfig;
pub use limit::{
    FixedWindowLimiter, GateDecision, GatePolicy, RateDecision, RateLimitPolicy, RequestGate,
    RequestMeta, derive_identity,
};
pub use usage::{
    BudgetDecision, FileStore, MemoryStore, SnapshotStore, UsageLimits, UsageMeter, UsageSnapshot,
};
