//! Caller identity derivation for rate limiting.
//!
//! Precedence: explicit caller-supplied identifier (an authenticated user
//! id) > first entry of `x-forwarded-for` > `x-real-ip` > the literal
//! [`UNKNOWN_IDENTITY`].
//!
//! The `"unknown"` fallback lumps every unattributable request into one
//! shared bucket. That fails closed — one anonymous-looking client can
//! exhaust the bucket for every other anonymous client behind the same
//! proxy — and is kept deliberately rather than silently strengthened.

use super::RequestMeta;

/// Forwarded client chain set by proxies; first entry is the original client.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Single client address set by reverse proxies such as nginx.
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Shared bucket for requests with no derivable identity.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Derive the rate-limit identity for a request.
pub fn derive_identity(explicit: Option<&str>, request: &RequestMeta) -> String {
    if let Some(id) = explicit {
        if !id.is_empty() {
            return id.to_owned();
        }
    }

    if let Some(forwarded) = request.header(FORWARDED_FOR_HEADER) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_owned();
            }
        }
    }

    if let Some(ip) = request.header(REAL_IP_HEADER) {
        let ip = ip.trim();
        if !ip.is_empty() {
            return ip.to_owned();
        }
    }

    UNKNOWN_IDENTITY.to_owned()
}
