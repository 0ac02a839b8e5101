//! Telemetry metric name constants.
//!
//! Centralised metric names for wayfarer operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `wayfarer_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `cache` — named cache instance (e.g. "geocoding", "ai_responses")
//! - `route` — route key the boundary guard was invoked for
//! - `reason` — budget denial reason string

/// Total cache hits.
///
/// Labels: `cache`.
pub const CACHE_HITS_TOTAL: &str = "wayfarer_cache_hits_total";

/// Total cache misses. Stale entries count as misses.
///
/// Labels: `cache`.
pub const CACHE_MISSES_TOTAL: &str = "wayfarer_cache_misses_total";

/// Total entries evicted, whether lazily on read or by a cleanup sweep.
///
/// Labels: `cache`.
pub const CACHE_EVICTIONS_TOTAL: &str = "wayfarer_cache_evictions_total";

/// Total requests denied by the fixed-window rate limiter.
///
/// Labels: `route`.
pub const RATE_DENIALS_TOTAL: &str = "wayfarer_rate_denials_total";

/// Total requests rejected for an oversized declared body.
///
/// Labels: `route`.
pub const SIZE_REJECTIONS_TOTAL: &str = "wayfarer_size_rejections_total";

/// Total budget checks denied by the usage meter.
///
/// Labels: `reason`.
pub const BUDGET_REJECTIONS_TOTAL: &str = "wayfarer_budget_rejections_total";

/// Total estimated tokens recorded against the external budget.
pub const USAGE_TOKENS_TOTAL: &str = "wayfarer_usage_tokens_total";
