//! `ctxpack pack`: resolve a scope and write the budgeted pack.

use std::path::PathBuf;

use chrono::Local;
use tracing::{debug, info};

use crate::config::ProjectConfig;
use crate::error::CliError;
use crate::pack::{PackRequest, build_pack, load_metadata, write_pack};
use crate::refresh::{ProjectRefresher, Refresher};
use crate::scope::{Scope, resolve};

/// Floor applied to `--max-kb`.
const MIN_MAX_KB: u64 = 4;

#[derive(Debug, Clone)]
pub struct PackArgs {
    pub scope: Scope,
    pub path: Option<String>,
    pub max_kb: u64,
    pub max_bytes: Option<u64>,
    pub out: PathBuf,
    pub symbols_per_file: usize,
    pub refresh_index: bool,
    pub root: PathBuf,
}

impl PackArgs {
    fn budget(&self) -> usize {
        let bytes = self
            .max_bytes
            .unwrap_or_else(|| self.max_kb.max(MIN_MAX_KB).saturating_mul(1024));
        usize::try_from(bytes).unwrap_or(usize::MAX)
    }
}

pub fn cmd_pack(args: PackArgs) -> anyhow::Result<()> {
    let root = super::project_root(&args.root)?;
    let config = ProjectConfig::load(&root);
    let mut metadata = load_metadata(&root, &config);
    debug!("index holds {} files", metadata.index.len());

    let resolution = resolve(args.scope, args.path.as_deref(), &root, &config, &metadata.index)?;
    if resolution.files.is_empty() {
        return Err(CliError::EmptySelection {
            scope: resolution.scope.to_string(),
        }
        .into());
    }

    if args.refresh_index {
        let refresher = ProjectRefresher::new(&root, &config);
        let mut changed = 0usize;
        for rel in &resolution.files {
            // Best effort: a file that fails to index is still packed.
            match refresher.reindex_file(rel) {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(err) => debug!("reindex {rel} failed: {err:#}"),
            }
        }
        if changed > 0 {
            info!("refreshed index for {changed} files");
        }
        metadata = load_metadata(&root, &config);
    }

    let request = PackRequest {
        project_name: config.project_name(&root),
        generated_at: Local::now(),
        scope: resolution.scope,
        scope_path: args.path.clone(),
        max_bytes: args.budget(),
        symbols_per_file: args.symbols_per_file,
    };
    let text = build_pack(&resolution.files, &metadata, &request);

    let out = root.join(&args.out);
    write_pack(&out, &text)?;
    println!("wrote: {} ({} bytes)", out.display(), text.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(max_kb: u64, max_bytes: Option<u64>) -> PackArgs {
        PackArgs {
            scope: Scope::Recent,
            path: None,
            max_kb,
            max_bytes,
            out: PathBuf::from("PACK.md"),
            symbols_per_file: 5,
            refresh_index: false,
            root: PathBuf::from("."),
        }
    }

    #[test]
    fn test_budget_floors_kib_and_prefers_bytes() {
        assert_eq!(args(24, None).budget(), 24 * 1024);
        assert_eq!(args(1, None).budget(), 4 * 1024);
        assert_eq!(args(24, Some(1024)).budget(), 1024);
        assert_eq!(args(u64::MAX, None).budget(), usize::MAX);
    }

    #[test]
    fn test_empty_selection_is_reported_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(24, None);
        a.root = dir.path().to_path_buf();

        let err = cmd_pack(a).unwrap_err();
        let cli_err = err.downcast_ref::<CliError>().expect("typed error");
        assert!(matches!(cli_err, CliError::EmptySelection { .. }));
        assert!(!dir.path().join("PACK.md").exists());
    }

    #[test]
    fn test_refresh_index_populates_metadata() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "pub fn a() {}\n").unwrap();

        let mut a = args(24, None);
        a.root = dir.path().to_path_buf();
        a.scope = Scope::Path;
        a.path = Some("src".into());
        a.refresh_index = true;
        cmd_pack(a).unwrap();

        let text = std::fs::read_to_string(dir.path().join("PACK.md")).unwrap();
        assert!(text.contains("- Path: `src`"));
        assert!(text.contains("- `src/lib.rs` (loc=1, mtime="));
        assert!(!text.contains("mtime=n/a"));
    }
}
