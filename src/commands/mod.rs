pub mod index;
pub mod pack;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::Context;

/// Canonicalize the `--root` argument so every later path comparison is exact.
fn project_root(root: &Path) -> anyhow::Result<PathBuf> {
    root.canonicalize()
        .with_context(|| format!("project root {} is not accessible", root.display()))
}
