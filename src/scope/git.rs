use std::path::Path;
use std::process::Command;

use anyhow::{Context, bail};

/// True when `root` looks like a git work tree.
pub fn git_available(root: &Path) -> bool {
    root.join(".git").exists()
}

/// Run `git <args>` in `root` and return its non-empty, trimmed stdout lines.
///
/// Fails when git cannot be spawned or exits non-zero.
pub fn run_git(root: &Path, args: &[&str]) -> anyhow::Result<Vec<String>> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            bail!("git failed: {}", args.join(" "));
        }
        bail!("{stderr}");
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Files added, copied or modified in the staging area.
pub fn staged_files(root: &Path) -> anyhow::Result<Vec<String>> {
    run_git(root, &["diff", "--cached", "--name-only", "--diff-filter=ACM"])
}

/// Modified working-tree files plus untracked, non-ignored files.
///
/// A failing untracked listing degrades to "no untracked files".
pub fn changed_files(root: &Path) -> anyhow::Result<Vec<String>> {
    let mut files = run_git(root, &["diff", "--name-only", "--diff-filter=ACM"])?;
    match run_git(root, &["ls-files", "-o", "--exclude-standard"]) {
        Ok(untracked) => files.extend(untracked),
        Err(err) => tracing::debug!("untracked listing failed: {err:#}"),
    }
    files.sort();
    files.dedup();
    Ok(files)
}
