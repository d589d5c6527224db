//! `ctxpack watch`: run a watch session until interrupted.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::ProjectConfig;
use crate::refresh::ProjectRefresher;
use crate::watcher::{WatchOptions, WatchSession, quiet_period_from_ms};

pub fn cmd_watch(root: &Path, debounce_ms: u64, poll: bool) -> anyhow::Result<()> {
    let root = super::project_root(root)?;
    let config = ProjectConfig::load(&root);
    let refresher = Arc::new(ProjectRefresher::new(&root, &config));
    let options = WatchOptions {
        quiet_period: quiet_period_from_ms(debounce_ms),
        force_polling: poll,
    };

    let session = WatchSession::start(&root, &config, refresher, &options)?;
    info!("press Ctrl+C to stop watching");

    // The session's threads do the work; the foreground only waits for the interrupt.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(tokio::signal::ctrl_c())?;

    info!("stopping {} watcher...", session.backend());
    session.stop();
    Ok(())
}
