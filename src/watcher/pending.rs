use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::event::ChangeEvent;

/// Paths waiting for their quiet period to elapse, keyed by path with the
/// time of the most recent event.
///
/// The lock is held only for a single insert or extract.
#[derive(Debug, Default)]
pub struct PendingChanges {
    inner: Mutex<HashMap<PathBuf, Instant>>,
}

impl PendingChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event now, restarting the path's quiet period.
    pub fn record(&self, event: ChangeEvent) {
        self.record_at(event.path, Instant::now());
    }

    pub fn record_at(&self, path: PathBuf, at: Instant) {
        self.lock().insert(path, at);
    }

    /// Remove and return every path whose last event is at least `quiet` old.
    ///
    /// The batch is sorted so reindex order does not depend on hashing.
    pub fn drain_settled(&self, now: Instant, quiet: Duration) -> Vec<PathBuf> {
        let mut ready = Vec::new();
        self.lock().retain(|path, last| {
            if now.saturating_duration_since(*last) >= quiet {
                ready.push(path.clone());
                false
            } else {
                true
            }
        });
        ready.sort();
        ready
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Instant>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
