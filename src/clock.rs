//! Time sources.
//!
//! Every component that ages entries or counts windows takes an
//! `Arc<dyn Clock>` instead of calling `Instant::now()` directly, so TTL
//! and window arithmetic can be driven deterministically in tests.
//!
//! Two views of time are exposed: a monotonic instant for durations (TTL
//! validity, window resets) and a wall clock for anything calendar- or
//! header-shaped (snapshot dates, `X-RateLimit-Reset` timestamps).

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Source of current time.
pub trait Clock: Send + Sync {
    /// Monotonic instant, used for TTL and window arithmetic.
    fn now(&self) -> Instant;

    /// Wall-clock time, used for calendar dates and response headers.
    fn wall(&self) -> DateTime<Utc>;
}

/// Production clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests.
///
/// Starts at the real current time and only moves when [`advance`] is
/// called, so a test can cross a TTL, a rate window, or a calendar day
/// without sleeping.
///
/// [`advance`]: ManualClock::advance
///
/// ```rust
/// # use std::time::Duration;
/// # use wayfarer::clock::{Clock, ManualClock};
/// let clock = ManualClock::new();
/// let before = clock.now();
/// clock.advance(Duration::from_secs(90));
/// assert_eq!(clock.now() - before, Duration::from_secs(90));
/// ```
pub struct ManualClock {
    start: Instant,
    epoch: DateTime<Utc>,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Create a clock frozen at the real current time.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Create a clock whose wall time starts at `epoch`.
    pub fn starting_at(epoch: DateTime<Utc>) -> Self {
        Self {
            start: Instant::now(),
            epoch,
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move both views of time forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut offset = self.offset.lock().unwrap();
        *offset += delta;
    }

    fn offset(&self) -> Duration {
        *self.offset.lock().unwrap()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.offset()
    }

    fn wall(&self) -> DateTime<Utc> {
        self.epoch + chrono::Duration::from_std(self.offset()).unwrap_or(chrono::Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_frozen_until_advanced() {
        let clock = ManualClock::new();
        let a = clock.now();
        let b = clock.now();
        assert_eq!(a, b);
    }

    #[test]
    fn advance_moves_both_views() {
        let clock = ManualClock::new();
        let instant = clock.now();
        let wall = clock.wall();

        clock.advance(Duration::from_secs(3600));

        assert_eq!(clock.now() - instant, Duration::from_secs(3600));
        assert_eq!(clock.wall() - wall, chrono::Duration::hours(1));
    }

    #[test]
    fn advancing_past_midnight_changes_the_date() {
        let epoch = "2026-08-05T23:30:00Z".parse().unwrap();
        let clock = ManualClock::starting_at(epoch);
        let before = clock.wall().date_naive();

        clock.advance(Duration::from_secs(3600));

        assert_ne!(clock.wall().date_naive(), before);
    }

    #[test]
    fn system_clock_moves() {
        let clock = SystemClock;
        let a = clock.now();
        assert!(clock.now() >= a);
    }
}
