//! Composite cache key construction.
//!
//! Keys are strings, not hashes: the logical namespace must stay visible
//! in the key so that [`ExpiringCache::invalidate`](super::ExpiringCache::invalidate)
//! can drop a whole namespace without knowing the parameter suffixes that
//! were used to build its entries.
//!
//! A key is `prefix|name=value|name=value…` with the parameter pairs
//! sorted by name. Two calls with the same pairs in different order
//! therefore produce the same key, which is what makes memoization work
//! for handlers that assemble their parameters in varying order.

use serde_json::Value;

/// Separates the namespace from parameter pairs, and pairs from each other.
///
/// Prefixes must not contain this character; parameter names should not
/// either (values are JSON-serialized, so a `|` inside a string value is
/// quoted and harmless).
pub const KEY_SEPARATOR: char = '|';

/// Build a deterministic composite key from a namespace and parameters.
///
/// Parameters are sorted lexicographically by name and serialized as
/// compact JSON (serde_json orders object keys, so nested maps are
/// deterministic too). Equal parameter sets yield equal keys regardless
/// of order:
///
/// ```rust
/// use serde_json::json;
/// use wayfarer::cache::cache_key;
///
/// let a = cache_key("geocode", &[("city", json!("Lisbon")), ("country", json!("PT"))]);
/// let b = cache_key("geocode", &[("country", json!("PT")), ("city", json!("Lisbon"))]);
/// assert_eq!(a, b);
/// ```
///
/// A call with no parameters returns the bare prefix.
pub fn cache_key(prefix: &str, params: &[(&str, Value)]) -> String {
    let mut sorted: Vec<&(&str, Value)> = params.iter().collect();
    sorted.sort_by_key(|(name, _)| *name);

    let mut key = String::from(prefix);
    for (name, value) in sorted {
        key.push(KEY_SEPARATOR);
        key.push_str(name);
        key.push('=');
        key.push_str(&value.to_string());
    }
    key
}

/// The namespace component of a composite key (everything before the
/// first separator).
pub(crate) fn namespace(key: &str) -> &str {
    key.split(KEY_SEPARATOR).next().unwrap_or(key)
}
