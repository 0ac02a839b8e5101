//! Caching subsystem.
//!
//! Three cooperating pieces:
//!
//! - [`cache_key`] — deterministic composite keys: a logical namespace
//!   plus a canonicalized (sorted, JSON-serialized) parameter set, so
//!   semantically identical requests collide regardless of argument order.
//!
//! - [`ExpiringCache`] — the TTL store itself: per-entry expiry checked
//!   lazily on read, namespace invalidation, and a periodic cleanup sweep.
//!   See [`store`] module docs for the lazy-expiry and failure semantics.
//!
//! - [`CacheRegistry`] — the fixed set of named instances (AI responses,
//!   geocoding, place details, destination searches, list and profile
//!   reads), each with a default TTL matched to its resource's staleness
//!   tolerance.
//!
//! Caches sit *beneath* the request boundary: the
//! [`RequestGate`](crate::limit::RequestGate) never consults them, and a
//! cache hit only changes whether a handler recomputes a value — never the
//! wire response shape.

pub mod key;
pub mod registry;
pub mod store;

pub use key::{KEY_SEPARATOR, cache_key};
pub use registry::{CacheRegistry, RegistryConfig};
pub use store::{CacheConfig, ExpiringCache, spawn_cleanup};
