pub mod drain;
pub mod event;
pub mod pending;
pub mod poll;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::config::ProjectConfig;
use crate::filter::PathFilter;
use crate::refresh::Refresher;

use drain::Drainer;
use event::classify_event;
use pending::PendingChanges;

/// Bounds applied to the user-supplied quiet period.
const MIN_QUIET_MS: u64 = 300;
const MAX_QUIET_MS: u64 = 1000;

/// Clamp a `--debounce-ms` value into the supported quiet-period range.
pub fn quiet_period_from_ms(ms: u64) -> Duration {
    Duration::from_millis(ms.clamp(MIN_QUIET_MS, MAX_QUIET_MS))
}

/// Stop flag shared by the session's threads. Waiting on it doubles as the
/// tick sleep, so a shutdown wakes sleepers immediately.
#[derive(Debug, Default)]
pub struct Shutdown {
    stopped: Mutex<bool>,
    cvar: Condvar,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.cvar.notify_all();
    }

    /// Sleep up to `timeout`. Returns true once shutdown has been triggered.
    pub fn wait(&self, timeout: Duration) -> bool {
        let guard = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .cvar
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Which mechanism feeds filesystem changes into the pending set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// OS notifications through `notify`.
    Events,
    /// Periodic mtime walks.
    Polling,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Events => f.write_str("events"),
            Backend::Polling => f.write_str("polling"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub quiet_period: Duration,
    /// Skip the event-driven backend entirely.
    pub force_polling: bool,
}

/// A running watch session: one ingestion source plus the drain thread.
///
/// Dropping the session (or calling [`WatchSession::stop`]) unsubscribes the
/// watcher, stops the threads and waits for an in-flight batch to finish.
pub struct WatchSession {
    root: PathBuf,
    backend: Backend,
    shutdown: Arc<Shutdown>,
    watcher: Option<RecommendedWatcher>,
    poller: Option<JoinHandle<()>>,
    drainer: Option<JoinHandle<()>>,
}

impl WatchSession {
    pub fn start(
        root: &Path,
        config: &ProjectConfig,
        refresher: Arc<dyn Refresher>,
        options: &WatchOptions,
    ) -> anyhow::Result<Self> {
        let filter = PathFilter::new(config);
        let pending = Arc::new(PendingChanges::new());
        let shutdown = Arc::new(Shutdown::new());

        let drainer = Drainer::new(root, pending.clone(), refresher, options.quiet_period)
            .spawn(shutdown.clone())?;

        let mut session = Self {
            root: root.to_path_buf(),
            backend: Backend::Polling,
            shutdown: shutdown.clone(),
            watcher: None,
            poller: None,
            drainer: Some(drainer),
        };

        if !options.force_polling {
            match start_event_watcher(root, filter.clone(), pending.clone()) {
                Ok(watcher) => {
                    session.watcher = Some(watcher);
                    session.backend = Backend::Events;
                }
                Err(err) => {
                    warn!("event-driven watcher unavailable ({err}); polling every 1s instead");
                }
            }
        }

        if session.backend == Backend::Polling {
            session.poller = Some(poll::spawn_poller(
                root.to_path_buf(),
                filter,
                pending,
                shutdown,
            )?);
        }

        info!(
            "watching {} via {} (debounce={}ms)",
            root.display(),
            session.backend,
            options.quiet_period.as_millis()
        );
        Ok(session)
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Unsubscribe, stop both threads and wait for them.
    pub fn stop(mut self) {
        self.shutdown_threads();
    }

    fn shutdown_threads(&mut self) {
        if let Some(mut watcher) = self.watcher.take()
            && let Err(err) = watcher.unwatch(&self.root)
        {
            debug!("unwatch failed: {err}");
        }
        self.shutdown.trigger();
        for handle in [self.poller.take(), self.drainer.take()].into_iter().flatten() {
            if handle.join().is_err() {
                warn!("watch thread panicked");
            }
        }
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.shutdown_threads();
    }
}

/// Subscribe to recursive notifications on `root`, recording trackable changes.
fn start_event_watcher(
    root: &Path,
    filter: PathFilter,
    pending: Arc<PendingChanges>,
) -> notify::Result<RecommendedWatcher> {
    let event_root = root.to_path_buf();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) => {
                if let Some(change) = classify_event(&event, &event_root, &filter) {
                    pending.record(change);
                }
            }
            Err(err) => debug!("watch error: {err}"),
        }
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok(watcher)
}
