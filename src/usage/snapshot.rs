//! Date-stamped usage snapshots and their persistence.
//!
//! The meter's counters survive a process restart only within the same
//! calendar day: a snapshot is stamped with the date it was written, and
//! a snapshot read back on a different date is discarded in full — never
//! merged, never decayed. Corrupt or unreadable snapshots are discarded
//! the same way; persistence is best-effort and the meter always has a
//! usable in-memory state.
//!
//! [`SnapshotStore`] is the durability seam: any key→value store works.
//! [`MemoryStore`] backs tests; [`FileStore`] writes one JSON file per
//! key under a directory.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Cumulative counters for one calendar day of budgeted upstream usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// The day these counters belong to.
    pub date: NaiveDate,
    /// Requests recorded today.
    pub requests_today: u32,
    /// Estimated tokens recorded today.
    pub tokens_today: u64,
    /// Requests recorded in the current minute window.
    pub requests_this_minute: u32,
    /// Unix milliseconds of the most recent recorded request; 0 when none.
    pub last_request_ms: i64,
}

impl UsageSnapshot {
    /// All-zero counters for the given day.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            requests_today: 0,
            tokens_today: 0,
            requests_this_minute: 0,
            last_request_ms: 0,
        }
    }
}

/// Key→value durability for usage snapshots.
///
/// Implementations may fail; the meter treats any failure as an absent
/// snapshot (on load) or logs and continues (on save).
pub trait SnapshotStore: Send + Sync {
    /// Read the raw value stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, overwriting.
    fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory store for tests and single-run processes.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// File-backed store: one JSON file per key under a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first
    /// save, not here.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The conventional per-user location, `~/.wayfarer`.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".wayfarer"))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SnapshotStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}
