//! Usage metering for the budgeted AI upstream.
//!
//! - [`UsageMeter`] — cumulative per-day and per-minute counters with a
//!   safety margin below the vendor's nominal quota; consulted *before*
//!   each metered call and recorded after.
//! - [`UsageSnapshot`] / [`SnapshotStore`] — date-stamped persistence so
//!   counters survive a restart within the same calendar day (and only
//!   within it).
//!
//! The meter guards spend; the rate limiter in [`crate::limit`] guards
//! traffic. A request can pass the boundary gate and still be vetoed
//! here when the day's budget is gone.

pub mod meter;
pub mod snapshot;

pub use meter::{
    BudgetDecision, REASON_DAILY_REQUESTS, REASON_DAILY_TOKENS, REASON_MINUTE_RATE, UsageLimits,
    UsageMeter,
};
pub use snapshot::{FileStore, MemoryStore, SnapshotStore, UsageSnapshot};
