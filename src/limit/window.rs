//! Fixed-window request counting.
//!
//! One [`RateWindow`] per `(route, identity)` pair: the first request in a
//! window sets `reset_at = now + window`, later requests increment the
//! counter until the cap, and a request at or past `reset_at` starts a
//! fresh window measured from *its* arrival.
//!
//! Fixed windows admit up to `2 × max_requests` in a short burst
//! straddling a window boundary. That imprecision is deliberate and
//! preserved — it matches how every caller of this limiter already
//! behaves. A token-bucket or sliding-log scheme would close the gap at
//! the cost of per-request timestamps; either can be swapped in behind
//! [`FixedWindowLimiter::check`] without changing the decision shape.
//!
//! Each check is one atomic check-then-update under a single mutex, so
//! concurrent requests against the same bucket can never lose an
//! increment.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::clock::Clock;
use crate::telemetry;

/// Per-route limit: at most `max_requests` per fixed `window`.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    /// Requests admitted per window.
    pub max_requests: u32,
    /// Window length.
    pub window: Duration,
}

impl RateLimitPolicy {
    /// Create a policy.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    /// Convenience for the common requests-per-minute shape.
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }
}

/// Outcome of a limiter check, carrying everything a cooperating client
/// needs to back off correctly.
#[derive(Debug, Clone)]
pub struct RateDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// The configured per-window cap.
    pub limit: u32,
    /// Requests left in the current window (0 when denied).
    pub remaining: u32,
    /// When the current window resets, as wall time for response headers.
    pub reset_at: DateTime<Utc>,
    /// Whole seconds until the window resets, rounded up. Only on denial.
    pub retry_after_secs: Option<u64>,
}

/// Counter state for one `(route, identity)` bucket.
#[derive(Debug)]
struct RateWindow {
    count: u32,
    reset_at: Instant,
    reset_wall: DateTime<Utc>,
}

/// Fixed-window rate limiter over `(route, identity)` buckets.
///
/// Process-wide shared state: create one at startup and hand an `Arc` to
/// every boundary that needs it. Buckets are created on first request and
/// reclaimed by [`sweep_expired`](Self::sweep_expired), since nothing
/// explicitly closes them.
pub struct FixedWindowLimiter {
    windows: Mutex<HashMap<(String, String), RateWindow>>,
    clock: Arc<dyn Clock>,
}

impl FixedWindowLimiter {
    /// Create a limiter against the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Check-and-count one request for `(route, identity)`.
    ///
    /// - No window, or the window has reset: start fresh with `count = 1`
    ///   and allow.
    /// - Below the cap: increment and allow.
    /// - At the cap: deny with `retry_after_secs = ceil(time-to-reset)`.
    pub fn check(&self, route: &str, identity: &str, policy: &RateLimitPolicy) -> RateDecision {
        let now = self.clock.now();
        let reset_wall = self.clock.wall()
            + chrono::Duration::from_std(policy.window).unwrap_or(chrono::Duration::MAX);

        let mut windows = self.windows.lock().unwrap();
        let window = windows
            .entry((route.to_owned(), identity.to_owned()))
            .or_insert_with(|| RateWindow {
                count: 0,
                reset_at: now,
                reset_wall,
            });

        if now >= window.reset_at {
            // Fresh window, measured from this request's arrival.
            window.count = 0;
            window.reset_at = now + policy.window;
            window.reset_wall = reset_wall;
        }

        if window.count < policy.max_requests {
            window.count += 1;
            RateDecision {
                allowed: true,
                limit: policy.max_requests,
                remaining: policy.max_requests - window.count,
                reset_at: window.reset_wall,
                retry_after_secs: None,
            }
        } else {
            let wait_ms = window.reset_at.duration_since(now).as_millis() as u64;
            let decision = RateDecision {
                allowed: false,
                limit: policy.max_requests,
                remaining: 0,
                reset_at: window.reset_wall,
                retry_after_secs: Some(wait_ms.div_ceil(1000)),
            };
            metrics::counter!(telemetry::RATE_DENIALS_TOTAL, "route" => route.to_owned())
                .increment(1);
            debug!(route, identity, retry_after = ?decision.retry_after_secs, "rate limit exceeded");
            decision
        }
    }

    /// Number of live buckets.
    pub fn bucket_count(&self) -> usize {
        self.windows.lock().unwrap().len()
    }

    /// Drop buckets whose window has already reset.
    ///
    /// Two-phase so the lock is never held across the full scan while
    /// requests are flowing: candidates are collected first, then removed
    /// with a re-check in case a bucket was refreshed in between.
    pub fn sweep_expired(&self) {
        let now = self.clock.now();

        let stale: Vec<(String, String)> = {
            let windows = self.windows.lock().unwrap();
            windows
                .iter()
                .filter(|(_, w)| w.reset_at <= now)
                .map(|(k, _)| k.clone())
                .collect()
        };

        if stale.is_empty() {
            return;
        }

        let mut windows = self.windows.lock().unwrap();
        let mut removed = 0usize;
        for key in stale {
            if windows.get(&key).is_some_and(|w| w.reset_at <= now) {
                windows.remove(&key);
                removed += 1;
            }
        }
        debug!(removed, "swept expired rate windows");
    }
}

/// Run [`FixedWindowLimiter::sweep_expired`] on a fixed interval.
///
/// Deterministic replacement for sweeping probabilistically on the
/// request path: with a real scheduler available the trigger mechanism
/// changes, the eventual reclamation it provides does not.
pub fn spawn_sweeper(limiter: Arc<FixedWindowLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await; // first tick completes immediately
        loop {
            interval.tick().await;
            limiter.sweep_expired();
        }
    })
}
