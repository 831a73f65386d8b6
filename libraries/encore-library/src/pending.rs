//! Pending tag write queue
//!
//! Edited-but-not-yet-flushed tag sets, keyed by filename, drained
//! opportunistically by the write-back path. A separate map records the time
//! of the last write *attempt* per filename; an attempt younger than the
//! debounce window suppresses retries regardless of whether it succeeded,
//! which stops repeated-write loops against a locked file or a codec that
//! keeps failing.

use encore_core::Tags;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Default minimum interval between write attempts for one filename
pub const DEFAULT_TAG_WRITE_DEBOUNCE: Duration = Duration::from_secs(30);

/// In-memory pending tag edits and per-path attempt times
///
/// Deliberately not persisted: the database row is already updated at edit
/// time, only the file copy lags, and the next edit or rescan converges it.
pub struct PendingTagWrites {
    debounce_ms: i64,
    pending: Mutex<HashMap<String, Tags>>,
    attempts: Mutex<HashMap<String, i64>>,
}

impl PendingTagWrites {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce_ms: debounce.as_millis() as i64,
            pending: Mutex::new(HashMap::new()),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Queue tags for a filename, merging with any already queued edit
    ///
    /// Per field, the newest value wins.
    pub fn add(&self, filename: &str, tags: &Tags) {
        if tags.is_empty() {
            return;
        }
        let mut pending = lock(&self.pending);
        let entry = pending.entry(filename.to_string()).or_default();
        for (tag, value) in tags {
            entry.insert(*tag, value.clone());
        }
    }

    /// The queued edit for a filename, if any
    pub fn get(&self, filename: &str) -> Option<Tags> {
        lock(&self.pending).get(filename).cloned()
    }

    /// Remove and return the queued edit for a filename
    pub fn take(&self, filename: &str) -> Option<Tags> {
        lock(&self.pending).remove(filename)
    }

    /// Filenames that currently have a queued edit
    pub fn files(&self) -> Vec<String> {
        lock(&self.pending).keys().cloned().collect()
    }

    /// Record a write attempt for a filename, at the current time
    pub fn mark_attempt(&self, filename: &str) {
        self.mark_attempt_at(filename, now_ms());
    }

    /// Whether a write attempt for a filename is inside the debounce window
    pub fn has_recent_attempt(&self, filename: &str) -> bool {
        self.has_recent_attempt_at(filename, now_ms())
    }

    fn mark_attempt_at(&self, filename: &str, when_ms: i64) {
        lock(&self.attempts).insert(filename.to_string(), when_ms);
    }

    fn has_recent_attempt_at(&self, filename: &str, now_ms: i64) -> bool {
        lock(&self.attempts)
            .get(filename)
            .is_some_and(|attempted| now_ms - attempted < self.debounce_ms)
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
