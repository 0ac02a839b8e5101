//! Rate limiting and the request boundary guard.
//!
//! - [`FixedWindowLimiter`] — one counter window per `(route, identity)`
//!   pair, reset at fixed boundaries.
//! - [`derive_identity`] — who a request is attributed to: explicit user
//!   id, forwarded-for header, real-ip header, or a shared `"unknown"`
//!   bucket, in that order.
//! - [`RequestGate`] — the boundary composition: declared-size check,
//!   then the limiter, then self-describing rate headers on every
//!   outcome.
//!
//! Everything here runs before a handler does any work; a denial is the
//! cheapest possible outcome for an abusive request.

pub mod gate;
pub mod identity;
pub mod window;

pub use gate::{
    GateDecision, GatePolicy, RequestGate, STATUS_PAYLOAD_TOO_LARGE, STATUS_TOO_MANY_REQUESTS,
};
pub use identity::{UNKNOWN_IDENTITY, derive_identity};
pub use window::{FixedWindowLimiter, RateDecision, RateLimitPolicy, spawn_sweeper};

/// The framework-neutral request view the core consumes.
///
/// The surrounding web layer adapts its own request type into this; the
/// core never sees framework types. Header lookup is case-insensitive.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// HTTP method (uppercase by convention; the core does not care).
    pub method: String,
    /// Request path, used for logging only — the route key passed to
    /// [`RequestGate::admit`] is the caller's, so that path parameters
    /// don't splinter rate buckets.
    pub path: String,
    /// Header name/value pairs as received.
    pub headers: Vec<(String, String)>,
    /// Declared body size from the `Content-Length` header, if any.
    pub content_length: Option<u64>,
}

impl RequestMeta {
    /// Create a request view with no headers and no declared body.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
            content_length: None,
        }
    }

    /// Append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the declared body size.
    pub fn with_content_length(mut self, bytes: u64) -> Self {
        self.content_length = Some(bytes);
        self
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
