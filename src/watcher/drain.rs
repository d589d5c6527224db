use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::filter::to_posix;
use crate::refresh::Refresher;

use super::Shutdown;
use super::pending::PendingChanges;

/// Interval between drain passes.
pub const DRAIN_TICK: Duration = Duration::from_millis(200);

/// Pause before the single retry of a failed reindex.
pub const RETRY_DELAY: Duration = Duration::from_millis(300);

/// Reindex attempts per file per batch: the first try plus one retry.
const MAX_ATTEMPTS: usize = 2;

/// What happened to one file of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Reindexed { changed: bool },
    /// Every attempt failed; the file was abandoned for this batch.
    Skipped,
}

/// Result of one non-empty drain pass.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<(String, FileOutcome)>,
    pub summarized: bool,
}

/// Moves settled paths out of the pending set and refreshes them.
pub struct Drainer {
    root: PathBuf,
    pending: Arc<PendingChanges>,
    refresher: Arc<dyn Refresher>,
    quiet_period: Duration,
    retry_delay: Duration,
}

impl Drainer {
    pub fn new(
        root: &Path,
        pending: Arc<PendingChanges>,
        refresher: Arc<dyn Refresher>,
        quiet_period: Duration,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            pending,
            refresher,
            quiet_period,
            retry_delay: RETRY_DELAY,
        }
    }

    #[cfg(test)]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Drain everything settled at `now`: reindex each file, then summarize once.
    ///
    /// Returns None when nothing was settled. The pending lock is released
    /// before any refresher call.
    pub fn drain_once(&self, now: Instant) -> Option<BatchReport> {
        let ready = self.pending.drain_settled(now, self.quiet_period);
        if ready.is_empty() {
            return None;
        }

        let mut report = BatchReport::default();
        for path in ready {
            let Ok(rel) = path.strip_prefix(&self.root) else {
                debug!("ignoring change outside root: {}", path.display());
                continue;
            };
            let rel = to_posix(rel);
            let outcome = self.reindex_with_retry(&rel);
            report.files.push((rel, outcome));
        }

        match self.refresher.summarize() {
            Ok(()) => report.summarized = true,
            Err(err) => warn!("summarize failed: {err:#}"),
        }

        let changed = report
            .files
            .iter()
            .filter(|(_, o)| matches!(o, FileOutcome::Reindexed { changed: true }))
            .count();
        info!("refreshed batch of {} files ({changed} changed)", report.files.len());
        Some(report)
    }

    fn reindex_with_retry(&self, rel: &str) -> FileOutcome {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.refresher.reindex_file(rel) {
                Ok(changed) => return FileOutcome::Reindexed { changed },
                Err(err) => {
                    debug!("reindex {rel} failed (attempt {attempt}/{MAX_ATTEMPTS}): {err:#}");
                    if attempt < MAX_ATTEMPTS {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }
        FileOutcome::Skipped
    }

    /// Drain every [`DRAIN_TICK`] until `shutdown` fires. A batch in flight
    /// when shutdown is requested runs to completion.
    pub fn run(&self, shutdown: &Shutdown) {
        while !shutdown.wait(DRAIN_TICK) {
            self.drain_once(Instant::now());
        }
    }

    pub fn spawn(self, shutdown: Arc<Shutdown>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("ctxpack-drain".into())
            .spawn(move || self.run(&shutdown))
    }
}
