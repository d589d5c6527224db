//! Reindex and summarize: the two side effects a watch batch triggers.
//!
//! Each step runs either a configured external command or the built-in
//! behaviour. The built-in reindex records line count and mtime in the file
//! index; the built-in summarize regenerates the recent-scope pack.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, bail};
use chrono::Local;
use tracing::debug;

use crate::config::ProjectConfig;
use crate::index::FileRecord;
use crate::index::store::{load_index, save_index};
use crate::pack::{PackRequest, build_pack, load_metadata, write_pack};
use crate::scope::{Scope, resolve};

/// Symbols listed per file in the built-in summarize pack.
const LATEST_SYMBOLS_PER_FILE: usize = 5;

/// The reindex/summarize capability driven by the watcher and `--refresh-index`.
pub trait Refresher: Send + Sync {
    /// Refresh the index entry for one repo-relative path. Returns whether it changed.
    fn reindex_file(&self, rel: &str) -> anyhow::Result<bool>;

    /// Refresh derived artifacts after a batch of reindexes.
    fn summarize(&self) -> anyhow::Result<()>;
}

/// Refresher configured from `ctxpack.toml`.
#[derive(Debug, Clone)]
pub struct ProjectRefresher {
    root: PathBuf,
    config: ProjectConfig,
}

impl ProjectRefresher {
    pub fn new(root: &Path, config: &ProjectConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config: config.clone(),
        }
    }

    /// Byte budget of the built-in summarize pack.
    fn latest_budget(&self) -> usize {
        let bytes = self.config.latest_max_kb.max(1).saturating_mul(1024);
        usize::try_from(bytes).unwrap_or(usize::MAX)
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(&self.config.index_path)
    }

    fn run_command(&self, argv: &[String], extra: Option<&str>) -> anyhow::Result<()> {
        let Some((program, args)) = argv.split_first() else {
            bail!("empty command");
        };
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(extra) = extra {
            cmd.arg(extra);
        }
        let status = cmd
            .status()
            .with_context(|| format!("failed to spawn {program}"))?;
        if !status.success() {
            bail!("{program} exited with {status}");
        }
        Ok(())
    }

    /// Record line count, size and mtime for `rel` in the index file.
    fn reindex_builtin(&self, rel: &str) -> anyhow::Result<bool> {
        let index_path = self.index_path();
        let mut index = load_index(&index_path);
        let abs = self.root.join(rel);

        let changed = if abs.is_file() {
            let bytes =
                std::fs::read(&abs).with_context(|| format!("failed to read {}", abs.display()))?;
            let metadata = std::fs::metadata(&abs)?;
            let mtime_secs = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            index.upsert(FileRecord {
                path: rel.to_string(),
                line_count: count_lines(&bytes),
                mtime_secs,
                size: metadata.len(),
                symbols: Vec::new(),
            })
        } else {
            index.remove(rel)
        };

        if changed {
            save_index(&index_path, &index)?;
        }
        Ok(changed)
    }

    /// Regenerate the recent-scope pack at `latest_context`.
    fn summarize_builtin(&self) -> anyhow::Result<()> {
        let metadata = load_metadata(&self.root, &self.config);
        let resolution = resolve(Scope::Recent, None, &self.root, &self.config, &metadata.index)?;
        let request = PackRequest {
            project_name: self.config.project_name(&self.root),
            generated_at: Local::now(),
            scope: resolution.scope,
            scope_path: None,
            max_bytes: self.latest_budget(),
            symbols_per_file: LATEST_SYMBOLS_PER_FILE,
        };
        let text = build_pack(&resolution.files, &metadata, &request);
        let out = self.root.join(&self.config.latest_context);
        write_pack(&out, &text)?;
        debug!("summarized {} files into {}", resolution.files.len(), out.display());
        Ok(())
    }
}

impl Refresher for ProjectRefresher {
    fn reindex_file(&self, rel: &str) -> anyhow::Result<bool> {
        match &self.config.reindex_command {
            Some(argv) => self.run_command(argv, Some(rel)).map(|()| true),
            None => self.reindex_builtin(rel),
        }
    }

    fn summarize(&self) -> anyhow::Result<()> {
        match &self.config.summarize_command {
            Some(argv) => self.run_command(argv, None),
            None => self.summarize_builtin(),
        }
    }
}

/// Number of lines in `bytes`; a final line without a newline still counts.
fn count_lines(bytes: &[u8]) -> usize {
    let newlines = bytes.iter().filter(|&&b| b == b'\n').count();
    match bytes.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup() -> (tempfile::TempDir, PathBuf, ProjectConfig) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let config = ProjectConfig {
            project_name: Some("demo".into()),
            ..ProjectConfig::default()
        };
        (dir, root, config)
    }

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines(b""), 0);
        assert_eq!(count_lines(b"one"), 1);
        assert_eq!(count_lines(b"one\ntwo\n"), 2);
        assert_eq!(count_lines(b"one\ntwo"), 2);
    }

    #[test]
    fn test_builtin_reindex_records_and_forgets_files() {
        let (_dir, root, config) = setup();
        fs::write(root.join("lib.rs"), "fn a() {}\nfn b() {}\n").unwrap();
        let refresher = ProjectRefresher::new(&root, &config);

        assert!(refresher.reindex_file("lib.rs").unwrap());
        assert!(!refresher.reindex_file("lib.rs").unwrap(), "unchanged file");

        let index = load_index(&root.join(&config.index_path));
        let record = index.read("lib.rs").unwrap();
        assert_eq!(record.line_count, 2);
        assert!(record.mtime_secs > 0);

        fs::remove_file(root.join("lib.rs")).unwrap();
        assert!(refresher.reindex_file("lib.rs").unwrap());
        assert!(load_index(&root.join(&config.index_path)).read("lib.rs").is_none());
    }

    #[test]
    fn test_builtin_summarize_writes_latest_context() {
        let (_dir, root, config) = setup();
        fs::write(root.join("README.md"), "# hi\n").unwrap();
        let refresher = ProjectRefresher::new(&root, &config);
        refresher.reindex_file("README.md").unwrap();
        refresher.summarize().unwrap();

        let text = fs::read_to_string(root.join(&config.latest_context)).unwrap();
        assert!(text.contains("- Project: `demo`"));
        assert!(text.contains("- Scope: `recent` (1 files)"));
        assert!(text.contains("- `README.md` (loc=1, mtime="));
    }

    #[test]
    fn test_latest_budget_saturates() {
        let (_dir, root, mut config) = setup();
        assert_eq!(ProjectRefresher::new(&root, &config).latest_budget(), 16 * 1024);
        config.latest_max_kb = 0;
        assert_eq!(ProjectRefresher::new(&root, &config).latest_budget(), 1024);
        config.latest_max_kb = u64::MAX;
        assert_eq!(ProjectRefresher::new(&root, &config).latest_budget(), usize::MAX);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_refresher_reports_exit_status() {
        let (_dir, root, mut config) = setup();
        config.reindex_command = Some(vec!["true".into()]);
        config.summarize_command = Some(vec!["false".into()]);
        let refresher = ProjectRefresher::new(&root, &config);

        assert!(refresher.reindex_file("anything.rs").unwrap());
        assert!(refresher.summarize().is_err());
    }

    #[test]
    fn test_empty_command_is_an_error() {
        let (_dir, root, mut config) = setup();
        config.summarize_command = Some(Vec::new());
        let refresher = ProjectRefresher::new(&root, &config);
        assert!(refresher.summarize().is_err());
    }
}
