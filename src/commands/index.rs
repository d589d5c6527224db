//! `ctxpack index`: one manual reindex + summarize batch.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ProjectConfig;
use crate::filter::PathFilter;
use crate::refresh::ProjectRefresher;
use crate::walker::walk_scope_dir;
use crate::watcher::drain::{Drainer, FileOutcome};
use crate::watcher::pending::PendingChanges;

pub fn cmd_index(root: &Path, paths: &[String]) -> anyhow::Result<()> {
    let root = super::project_root(root)?;
    let config = ProjectConfig::load(&root);
    let filter = PathFilter::new(&config);

    let pending = Arc::new(PendingChanges::new());
    let now = Instant::now();
    if paths.is_empty() {
        for path in walk_scope_dir(&root, &filter) {
            if filter.is_trackable(&path, &root) {
                pending.record_at(path, now);
            }
        }
    } else {
        for rel in paths {
            pending.record_at(root.join(rel), now);
        }
    }

    // A zero quiet period makes every recorded path settled immediately.
    let refresher = Arc::new(ProjectRefresher::new(&root, &config));
    let drainer = Drainer::new(&root, pending, refresher, Duration::ZERO);
    let Some(report) = drainer.drain_once(now) else {
        println!("nothing to index");
        return Ok(());
    };

    let changed = report
        .files
        .iter()
        .filter(|(_, o)| matches!(o, FileOutcome::Reindexed { changed: true }))
        .count();
    let skipped = report
        .files
        .iter()
        .filter(|(_, o)| *o == FileOutcome::Skipped)
        .count();
    println!(
        "indexed {} files ({changed} changed, {skipped} skipped)",
        report.files.len()
    );
    if !report.summarized {
        anyhow::bail!("summarize failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::store::load_index;

    #[test]
    fn test_index_all_trackable_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/x")).unwrap();
        std::fs::write(root.join("src/lib.rs"), "fn a() {}\n").unwrap();
        std::fs::write(root.join("node_modules/x/y.rs"), "fn b() {}\n").unwrap();
        std::fs::write(root.join("data.bin"), [0u8, 1, 2]).unwrap();

        cmd_index(root, &[]).unwrap();

        let config = ProjectConfig::default();
        let index = load_index(&root.join(&config.index_path));
        assert_eq!(index.len(), 1);
        assert!(index.read("src/lib.rs").is_some());
        assert!(root.join(&config.latest_context).exists());
    }
}
