//! The request boundary guard.
//!
//! [`RequestGate`] composes, in order: a declared-body-size check, the
//! fixed-window limiter, and response-header injection. Per request the
//! progression is `received → size checked → rate checked → allowed |
//! denied`; a denial is terminal — the gate never retries, the client
//! must resend later.
//!
//! An oversized body is rejected with status 413 *before* any rate-limit
//! bookkeeping, so abusive payloads cannot burn a caller's allowance (and
//! carry no rate headers, since the limiter was never consulted). Every
//! decision the limiter does make — allowed or denied — carries
//! `X-RateLimit-*` headers so responses are self-describing either way.
//!
//! The gate knows nothing about caching. Caches live inside handlers,
//! beneath this boundary.

use std::sync::Arc;

use tracing::debug;

use crate::telemetry;

use super::RequestMeta;
use super::identity::derive_identity;
use super::window::{FixedWindowLimiter, RateDecision, RateLimitPolicy};

/// Seconds a denied client should wait before resending.
pub const RETRY_AFTER: &str = "Retry-After";
/// The configured per-window request cap.
pub const RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";
/// Requests left in the current window.
pub const RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
/// ISO-8601 timestamp of the current window's reset.
pub const RATE_LIMIT_RESET: &str = "X-RateLimit-Reset";

/// HTTP-equivalent status for a rate-limit denial.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;
/// HTTP-equivalent status for an oversized declared body.
pub const STATUS_PAYLOAD_TOO_LARGE: u16 = 413;

/// Boundary policy for one route: a byte ceiling and a rate limit.
#[derive(Debug, Clone)]
pub struct GatePolicy {
    /// Maximum declared request-body size in bytes. Default: 1 MiB.
    pub max_body_bytes: u64,
    /// Rate limit applied after the size check.
    pub rate: RateLimitPolicy,
}

impl GatePolicy {
    /// Create a policy.
    pub fn new(max_body_bytes: u64, rate: RateLimitPolicy) -> Self {
        Self {
            max_body_bytes,
            rate,
        }
    }
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
            rate: RateLimitPolicy::per_minute(60),
        }
    }
}

/// Outcome of admitting one request at the boundary.
///
/// Both variants carry the response headers the web layer should attach.
#[derive(Debug, Clone)]
pub enum GateDecision {
    /// The request may proceed to its handler.
    Allowed {
        /// `X-RateLimit-*` headers describing the caller's allowance.
        headers: Vec<(String, String)>,
    },
    /// The request must not proceed.
    Denied {
        /// HTTP-equivalent status: 413 or 429.
        status: u16,
        /// Human-readable denial reason.
        reason: String,
        /// Whole seconds until a resend could succeed (429 only).
        retry_after_secs: Option<u64>,
        /// Response headers; includes `Retry-After` for 429, empty for
        /// 413 (the limiter was never consulted).
        headers: Vec<(String, String)>,
    },
}

impl GateDecision {
    /// Whether the request was admitted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed { .. })
    }

    /// Response headers for either outcome.
    pub fn headers(&self) -> &[(String, String)] {
        match self {
            GateDecision::Allowed { headers } => headers,
            GateDecision::Denied { headers, .. } => headers,
        }
    }
}

/// The boundary guard applied to every inbound request.
pub struct RequestGate {
    limiter: Arc<FixedWindowLimiter>,
}

impl RequestGate {
    /// Create a gate over a shared limiter.
    pub fn new(limiter: Arc<FixedWindowLimiter>) -> Self {
        Self { limiter }
    }

    /// Admit or deny one request.
    ///
    /// `route` keys the rate bucket (pass a stable route name, not the
    /// raw path); `identity` is the authenticated user id when known,
    /// with header-based derivation as the fallback.
    pub fn admit(
        &self,
        request: &RequestMeta,
        route: &str,
        identity: Option<&str>,
        policy: &GatePolicy,
    ) -> GateDecision {
        if let Some(declared) = request.content_length {
            if declared > policy.max_body_bytes {
                metrics::counter!(telemetry::SIZE_REJECTIONS_TOTAL, "route" => route.to_owned())
                    .increment(1);
                debug!(route, declared, limit = policy.max_body_bytes, "declared body too large");
                return GateDecision::Denied {
                    status: STATUS_PAYLOAD_TOO_LARGE,
                    reason: format!(
                        "declared body of {declared} bytes exceeds the {} byte limit",
                        policy.max_body_bytes
                    ),
                    retry_after_secs: None,
                    headers: Vec::new(),
                };
            }
        }

        let identity = derive_identity(identity, request);
        let decision = self.limiter.check(route, &identity, &policy.rate);
        let mut headers = rate_headers(&decision);

        if decision.allowed {
            GateDecision::Allowed { headers }
        } else {
            if let Some(secs) = decision.retry_after_secs {
                headers.push((RETRY_AFTER.to_owned(), secs.to_string()));
            }
            GateDecision::Denied {
                status: STATUS_TOO_MANY_REQUESTS,
                reason: "too many requests".to_owned(),
                retry_after_secs: decision.retry_after_secs,
                headers,
            }
        }
    }
}

/// Self-describing rate headers for any limiter decision.
fn rate_headers(decision: &RateDecision) -> Vec<(String, String)> {
    vec![
        (RATE_LIMIT_LIMIT.to_owned(), decision.limit.to_string()),
        (
            RATE_LIMIT_REMAINING.to_owned(),
            decision.remaining.to_string(),
        ),
        (
            RATE_LIMIT_RESET.to_owned(),
            decision.reset_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn gate() -> RequestGate {
        let clock = Arc::new(ManualClock::new());
        RequestGate::new(Arc::new(FixedWindowLimiter::new(clock)))
    }

    fn policy() -> GatePolicy {
        GatePolicy::new(1024, RateLimitPolicy::new(2, Duration::from_secs(60)))
    }

    #[test]
    fn small_request_is_admitted_with_headers() {
        let gate = gate();
        let req = RequestMeta::new("POST", "/api/groups").with_content_length(100);

        let decision = gate.admit(&req, "groups:create", Some("user-1"), &policy());
        assert!(decision.is_allowed());

        let names: Vec<&str> = decision.headers().iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&RATE_LIMIT_LIMIT));
        assert!(names.contains(&RATE_LIMIT_REMAINING));
        assert!(names.contains(&RATE_LIMIT_RESET));
    }

    #[test]
    fn oversized_body_is_rejected_without_rate_headers() {
        let gate = gate();
        let req = RequestMeta::new("POST", "/api/groups").with_content_length(4096);

        match gate.admit(&req, "groups:create", Some("user-1"), &policy()) {
            GateDecision::Denied {
                status, headers, ..
            } => {
                assert_eq!(status, STATUS_PAYLOAD_TOO_LARGE);
                assert!(headers.is_empty());
            }
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[test]
    fn undeclared_body_size_passes_the_size_check() {
        let gate = gate();
        let req = RequestMeta::new("GET", "/api/groups");
        assert!(gate.admit(&req, "groups:list", Some("user-1"), &policy()).is_allowed());
    }

    #[test]
    fn denial_carries_retry_after() {
        let gate = gate();
        let req = RequestMeta::new("GET", "/api/groups");
        let policy = policy();

        gate.admit(&req, "groups:list", Some("user-1"), &policy);
        gate.admit(&req, "groups:list", Some("user-1"), &policy);

        match gate.admit(&req, "groups:list", Some("user-1"), &policy) {
            GateDecision::Denied {
                status,
                retry_after_secs,
                headers,
                ..
            } => {
                assert_eq!(status, STATUS_TOO_MANY_REQUESTS);
                assert!(retry_after_secs.is_some());
                assert!(headers.iter().any(|(n, _)| n == RETRY_AFTER));
                assert!(
                    headers
                        .iter()
                        .any(|(n, v)| n == RATE_LIMIT_REMAINING && v == "0")
                );
            }
            other => panic!("expected denial, got {other:?}"),
        }
    }
}
