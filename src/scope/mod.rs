pub mod git;

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use clap::ValueEnum;
use tracing::{debug, warn};

use crate::config::ProjectConfig;
use crate::error::CliError;
use crate::filter::{PathFilter, to_posix};
use crate::index::FileIndex;
use crate::walker::walk_scope_dir;

/// Named strategy selecting candidate files for a pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scope {
    /// Files added, copied or modified in the git staging area.
    Staged,
    /// Modified working-tree files plus untracked files.
    Changed,
    /// A single file or a directory walked recursively (requires --path).
    Path,
    /// The most recently modified files known to the index.
    Recent,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::Staged => "staged",
            Scope::Changed => "changed",
            Scope::Path => "path",
            Scope::Recent => "recent",
        };
        f.write_str(name)
    }
}

/// The outcome of resolving a scope: the scope actually used and its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub scope: Scope,
    /// Repo-relative `/`-separated paths. Sorted, except for `recent`.
    pub files: Vec<String>,
}

/// Resolve `requested` into the ordered set of repo-relative files to pack.
///
/// Git-backed scopes fall back to `recent` when git is unavailable or fails.
/// `root` must be canonical.
pub fn resolve(
    requested: Scope,
    scope_path: Option<&str>,
    root: &Path,
    config: &ProjectConfig,
    index: &FileIndex,
) -> Result<Resolution, CliError> {
    let filter = PathFilter::new(config);

    let mut scope = requested;
    let mut candidates = match requested {
        Scope::Staged | Scope::Changed if !git::git_available(root) => {
            warn!("scope={requested} requires git; falling back to scope=recent");
            None
        }
        Scope::Staged | Scope::Changed => {
            let listed = if requested == Scope::Staged {
                git::staged_files(root)
            } else {
                git::changed_files(root)
            };
            match listed {
                Ok(files) => Some(files),
                Err(err) => {
                    warn!("scope={requested} failed ({err:#}); falling back to scope=recent");
                    None
                }
            }
        }
        Scope::Path => {
            let Some(path) = scope_path.filter(|p| !p.trim().is_empty()) else {
                return Err(CliError::Usage("--path is required for --scope=path".into()));
            };
            Some(files_from_path(root, &filter, path))
        }
        Scope::Recent => None,
    };

    if candidates.is_none() {
        scope = Scope::Recent;
        if index.is_empty() {
            debug!("index is empty; run `ctxpack index` to populate scope=recent");
        }
        candidates = Some(index.most_recent(config.max_recent_files));
    }

    let files = filter_repo_files(
        root,
        &filter,
        candidates.unwrap_or_default(),
        scope == Scope::Recent,
    );
    Ok(Resolution { scope, files })
}

/// Files selected by `scope=path`: one file, or a directory walked recursively.
fn files_from_path(root: &Path, filter: &PathFilter, scope_path: &str) -> Vec<String> {
    let candidate = Path::new(scope_path);
    let candidate = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    // Nonexistent paths fail to canonicalize.
    let Ok(candidate) = candidate.canonicalize() else {
        return Vec::new();
    };
    let Ok(rel) = candidate.strip_prefix(root) else {
        return Vec::new();
    };

    if candidate.is_file() {
        return if filter.accepts(rel) {
            vec![to_posix(rel)]
        } else {
            Vec::new()
        };
    }

    let mut files: Vec<String> = walk_scope_dir(&candidate, filter)
        .into_iter()
        .filter_map(|abs| abs.strip_prefix(root).ok().map(Path::to_path_buf))
        .filter(|rel| filter.accepts(rel))
        .map(|rel| to_posix(&rel))
        .collect();
    files.sort();
    files.dedup();
    files
}

/// Apply exclusion, inclusion and existence checks to candidate paths.
///
/// With `keep_order` the first occurrence of each path keeps its position;
/// otherwise the result is sorted.
fn filter_repo_files(
    root: &Path,
    filter: &PathFilter,
    candidates: Vec<String>,
    keep_order: bool,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for candidate in candidates {
        if candidate.is_empty() {
            continue;
        }
        let path = Path::new(&candidate);
        let rel = if path.is_absolute() {
            match path.strip_prefix(root) {
                Ok(rel) => rel,
                Err(_) => continue,
            }
        } else {
            path
        };
        if !filter.accepts(rel) || !root.join(rel).is_file() {
            continue;
        }
        let rel = to_posix(rel);
        if seen.insert(rel.clone()) {
            out.push(rel);
        }
    }
    if !keep_order {
        out.sort();
    }
    out
}
