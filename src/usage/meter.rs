//! Budget tracking for an external metered resource.
//!
//! [`UsageMeter`] counts requests and estimated tokens against the AI
//! vendor's quota and vetoes calls *before* they are made, so a burst of
//! concurrent handlers cannot collectively blow through the real external
//! limit on the strength of local estimates. Three independent ceilings
//! are enforced — requests per day, requests per minute, tokens per day —
//! each at a configured fraction of the vendor's nominal number (the
//! safety margin, default half).
//!
//! Like the rate limiter's windows, the per-minute counter resets lazily:
//! every check compares the gap since the last recorded request against
//! one minute, so no background timer is involved. The daily counters
//! reset when the calendar date changes, also observed lazily.
//!
//! A denied budget check is recoverable locally — callers are expected to
//! degrade (serve a placeholder, skip the enrichment) rather than surface
//! a hard failure to the end user.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::telemetry;

use super::snapshot::{SnapshotStore, UsageSnapshot};

/// Denial reason: the effective daily request ceiling is reached.
pub const REASON_DAILY_REQUESTS: &str = "Daily request limit reached";
/// Denial reason: the effective per-minute request ceiling is reached.
pub const REASON_MINUTE_RATE: &str = "Rate limit: Too many requests per minute";
/// Denial reason: the effective daily token ceiling is reached.
pub const REASON_DAILY_TOKENS: &str = "Daily token limit reached";

/// Nominal vendor ceilings and the enforced safety margin.
///
/// ```rust
/// # use wayfarer::usage::UsageLimits;
/// let limits = UsageLimits::new()
///     .requests_per_day(1_000)
///     .safety_margin(0.8);
/// ```
#[derive(Debug, Clone)]
pub struct UsageLimits {
    /// Vendor-advertised requests per day. Default: 1,500.
    pub requests_per_day: u32,
    /// Vendor-advertised requests per minute. Default: 15.
    pub requests_per_minute: u32,
    /// Vendor-advertised tokens (or equivalent cost units) per day.
    /// Default: 1,000,000.
    pub tokens_per_day: u64,
    /// Fraction of each nominal ceiling actually enforced, absorbing
    /// local estimation error. Default: 0.5.
    pub safety_margin: f64,
}

impl Default for UsageLimits {
    fn default() -> Self {
        Self {
            requests_per_day: 1_500,
            requests_per_minute: 15,
            tokens_per_day: 1_000_000,
            safety_margin: 0.5,
        }
    }
}

impl UsageLimits {
    /// Create limits with the defaults above.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the nominal daily request ceiling.
    pub fn requests_per_day(mut self, n: u32) -> Self {
        self.requests_per_day = n;
        self
    }

    /// Set the nominal per-minute request ceiling.
    pub fn requests_per_minute(mut self, n: u32) -> Self {
        self.requests_per_minute = n;
        self
    }

    /// Set the nominal daily token ceiling.
    pub fn tokens_per_day(mut self, n: u64) -> Self {
        self.tokens_per_day = n;
        self
    }

    /// Set the enforced fraction of each nominal ceiling.
    pub fn safety_margin(mut self, fraction: f64) -> Self {
        self.safety_margin = fraction;
        self
    }

    fn effective(&self, nominal: u64) -> u64 {
        (nominal as f64 * self.safety_margin).floor() as u64
    }
}

/// Outcome of a budget check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BudgetDecision {
    /// The budgeted call may proceed.
    Allowed,
    /// The call must not be made; `reason` is one of the `REASON_*`
    /// constants.
    Denied {
        /// First violated ceiling, in daily-requests → minute → tokens
        /// order.
        reason: &'static str,
    },
}

impl BudgetDecision {
    /// Whether the call may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, BudgetDecision::Allowed)
    }
}

/// Process-wide usage meter for one budgeted upstream.
///
/// Create once at startup; hand an `Arc` to every handler that calls the
/// metered resource. Counters are restored from the snapshot store when
/// the stored date matches today, and discarded in full otherwise.
pub struct UsageMeter {
    limits: UsageLimits,
    clock: Arc<dyn Clock>,
    store: Arc<dyn SnapshotStore>,
    state: Mutex<UsageSnapshot>,
}

impl UsageMeter {
    /// Key the snapshot is stored under.
    pub const STORE_KEY: &'static str = "usage";

    /// Create a meter, restoring today's snapshot from `store` if one
    /// exists.
    pub fn new(limits: UsageLimits, clock: Arc<dyn Clock>, store: Arc<dyn SnapshotStore>) -> Self {
        let today = clock.wall().date_naive();
        let state = match store.load(Self::STORE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<UsageSnapshot>(&raw) {
                Ok(snapshot) if snapshot.date == today => snapshot,
                Ok(snapshot) => {
                    debug!(stored = %snapshot.date, "discarding usage snapshot from another day");
                    UsageSnapshot::empty(today)
                }
                Err(e) => {
                    warn!(error = %e, "corrupt usage snapshot, starting from zero");
                    UsageSnapshot::empty(today)
                }
            },
            Ok(None) => UsageSnapshot::empty(today),
            Err(e) => {
                warn!(error = %e, "usage snapshot unreadable, starting from zero");
                UsageSnapshot::empty(today)
            }
        };
        Self {
            limits,
            clock,
            store,
            state: Mutex::new(state),
        }
    }

    /// Evaluate all three ceilings.
    ///
    /// Returns the first violated reason in daily-requests → per-minute →
    /// daily-tokens order, else [`BudgetDecision::Allowed`]. Lazy resets
    /// (new day, stale minute window) are applied before evaluating.
    pub fn check_budget(&self) -> BudgetDecision {
        let now = self.clock.wall();
        let mut state = self.state.lock().unwrap();
        refresh(&mut state, now);

        let reason = if u64::from(state.requests_today)
            >= self.limits.effective(u64::from(self.limits.requests_per_day))
        {
            Some(REASON_DAILY_REQUESTS)
        } else if u64::from(state.requests_this_minute)
            >= self.limits.effective(u64::from(self.limits.requests_per_minute))
        {
            Some(REASON_MINUTE_RATE)
        } else if state.tokens_today >= self.limits.effective(self.limits.tokens_per_day) {
            Some(REASON_DAILY_TOKENS)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                metrics::counter!(telemetry::BUDGET_REJECTIONS_TOTAL, "reason" => reason)
                    .increment(1);
                debug!(reason, "budget check denied");
                BudgetDecision::Denied { reason }
            }
            None => BudgetDecision::Allowed,
        }
    }

    /// Record one performed call and its estimated cost, then persist a
    /// date-stamped snapshot.
    ///
    /// Persistence is best-effort: a failed write is logged and the
    /// in-memory counters stay authoritative for this process.
    pub fn record_usage(&self, estimated_tokens: u64) {
        let now = self.clock.wall();
        let mut state = self.state.lock().unwrap();
        refresh(&mut state, now);

        state.requests_today += 1;
        state.requests_this_minute += 1;
        state.tokens_today += estimated_tokens;
        state.last_request_ms = now.timestamp_millis();

        metrics::counter!(telemetry::USAGE_TOKENS_TOTAL).increment(estimated_tokens);

        match serde_json::to_string(&*state) {
            Ok(raw) => {
                if let Err(e) = self.store.save(Self::STORE_KEY, &raw) {
                    warn!(error = %e, "failed to persist usage snapshot");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode usage snapshot"),
        }
    }

    /// Current counters after lazy resets, for dashboards and tests.
    pub fn counters(&self) -> UsageSnapshot {
        let now = self.clock.wall();
        let mut state = self.state.lock().unwrap();
        refresh(&mut state, now);
        state.clone()
    }
}

/// Minute-window gap before the per-minute counter resets.
const MINUTE_WINDOW_MS: i64 = 60_000;

/// Apply lazy resets: a date change zeroes everything, a stale minute
/// window zeroes only the per-minute counter.
fn refresh(state: &mut UsageSnapshot, now: DateTime<Utc>) {
    let today = now.date_naive();
    if state.date != today {
        *state = UsageSnapshot::empty(today);
        return;
    }
    if state.last_request_ms != 0 && now.timestamp_millis() - state.last_request_ms > MINUTE_WINDOW_MS
    {
        state.requests_this_minute = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::usage::snapshot::MemoryStore;
    use std::time::Duration;

    fn meter(limits: UsageLimits) -> (Arc<ManualClock>, UsageMeter) {
        // Pinned to midday so advancing a minute never crosses midnight.
        let clock = Arc::new(ManualClock::starting_at("2026-08-05T12:00:00Z".parse().unwrap()));
        let meter = UsageMeter::new(limits, clock.clone(), Arc::new(MemoryStore::new()));
        (clock, meter)
    }

    #[test]
    fn fresh_meter_allows() {
        let (_, meter) = meter(UsageLimits::default());
        assert!(meter.check_budget().is_allowed());
    }

    #[test]
    fn denial_reasons_come_in_order() {
        // Margin 1.0 makes the nominal numbers the effective ones.
        let limits = UsageLimits::new()
            .requests_per_day(2)
            .requests_per_minute(2)
            .tokens_per_day(1_000)
            .safety_margin(1.0);
        let (clock, meter) = meter(limits);

        meter.record_usage(10);
        clock.advance(Duration::from_secs(61));
        meter.record_usage(10);

        // Minute counter reset by the gap, so the daily ceiling trips first.
        assert_eq!(
            meter.check_budget(),
            BudgetDecision::Denied {
                reason: REASON_DAILY_REQUESTS
            }
        );
    }

    #[test]
    fn minute_ceiling_trips_before_tokens() {
        let limits = UsageLimits::new()
            .requests_per_day(100)
            .requests_per_minute(1)
            .tokens_per_day(1_000)
            .safety_margin(1.0);
        let (_, meter) = meter(limits);

        meter.record_usage(10);
        assert_eq!(
            meter.check_budget(),
            BudgetDecision::Denied {
                reason: REASON_MINUTE_RATE
            }
        );
    }

    #[test]
    fn token_ceiling_trips() {
        let limits = UsageLimits::new()
            .requests_per_day(100)
            .requests_per_minute(100)
            .tokens_per_day(100)
            .safety_margin(1.0);
        let (_, meter) = meter(limits);

        meter.record_usage(100);
        assert_eq!(
            meter.check_budget(),
            BudgetDecision::Denied {
                reason: REASON_DAILY_TOKENS
            }
        );
    }

    #[test]
    fn safety_margin_halves_the_nominal_ceiling() {
        let limits = UsageLimits::new()
            .requests_per_day(4)
            .requests_per_minute(100)
            .tokens_per_day(1_000_000)
            .safety_margin(0.5);
        let (_, meter) = meter(limits);

        meter.record_usage(1);
        assert!(meter.check_budget().is_allowed());
        meter.record_usage(1);
        // 2 of nominal 4 recorded; effective ceiling is 2.
        assert_eq!(
            meter.check_budget(),
            BudgetDecision::Denied {
                reason: REASON_DAILY_REQUESTS
            }
        );
    }

    #[test]
    fn minute_counter_resets_after_sixty_second_gap() {
        let limits = UsageLimits::new().safety_margin(1.0);
        let (clock, meter) = meter(limits);

        meter.record_usage(10);
        meter.record_usage(10);
        assert_eq!(meter.counters().requests_this_minute, 2);

        clock.advance(Duration::from_secs(61));
        assert_eq!(meter.counters().requests_this_minute, 0);
        // Daily counters are untouched by the minute reset.
        assert_eq!(meter.counters().requests_today, 2);
    }
}
