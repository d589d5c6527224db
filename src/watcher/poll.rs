use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use crate::filter::PathFilter;
use crate::walker::walk_for_polling;

use super::Shutdown;
use super::event::ChangeEvent;
use super::pending::PendingChanges;

/// Interval between polling walks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Last seen modification time of every trackable file found by the previous walk.
#[derive(Debug, Default)]
pub struct PollState {
    tracked: HashMap<PathBuf, SystemTime>,
}

impl PollState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk the tree once and return the trackable files that are new or whose
    /// mtime changed. Files no longer present are forgotten silently.
    pub fn scan(&mut self, root: &Path, filter: &PathFilter) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut changed = Vec::new();

        for path in walk_for_polling(root, filter) {
            if !filter.is_trackable(&path, root) {
                continue;
            }
            seen.insert(path.clone());
            let Ok(mtime) = std::fs::metadata(&path).and_then(|m| m.modified()) else {
                continue;
            };
            match self.tracked.insert(path.clone(), mtime) {
                Some(previous) if previous == mtime => {}
                _ => changed.push(path),
            }
        }

        self.tracked.retain(|path, _| seen.contains(path));
        changed.sort();
        changed
    }

    #[cfg(test)]
    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }
}

/// Spawn the polling ingestion thread. It walks `root` every [`POLL_INTERVAL`]
/// until `shutdown` fires, feeding changes into `pending`.
pub fn spawn_poller(
    root: PathBuf,
    filter: PathFilter,
    pending: Arc<PendingChanges>,
    shutdown: Arc<Shutdown>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("ctxpack-poll".into())
        .spawn(move || {
            let mut state = PollState::new();
            while !shutdown.wait(POLL_INTERVAL) {
                for path in state.scan(&root, &filter) {
                    pending.record(ChangeEvent { path });
                }
            }
        })
}
