use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::{ProjectConfig, STATE_DIR};

/// Suffixes written by editors and toolchains that never warrant a reindex.
const IGNORE_SUFFIXES: &[&str] = &[".swp", ".tmp", ".bak", ".pyc", "~"];

/// Extensions tracked when none can be derived from the include globs.
const FALLBACK_EXTENSIONS: &[&str] = &["md", "ts", "tsx", "js", "jsx", "json", "yml", "yaml", "toml"];

/// Characters that make a derived extension a pattern rather than a literal.
const GLOB_META: &[char] = &['*', '?', '[', ']', '{', '}'];

/// Inclusion/exclusion rules shared by scope resolution and the watcher.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: Vec<String>,
    exclude_dirs: Vec<String>,
    extensions: BTreeSet<String>,
    /// Root-relative directories ctxpack writes into, excluded regardless of `exclude_dirs`.
    output_dirs: Vec<PathBuf>,
}

impl PathFilter {
    pub fn new(config: &ProjectConfig) -> Self {
        let mut filter = Self::from_parts(&config.include_globs, &config.exclude_dirs);
        filter.output_dirs = [&config.latest_context, &config.index_path]
            .into_iter()
            .filter(|p| p.is_relative())
            .filter_map(|p| p.parent())
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .collect();
        filter
    }

    pub fn from_parts(include_globs: &[String], exclude_dirs: &[String]) -> Self {
        Self {
            include: include_globs.to_vec(),
            exclude_dirs: exclude_dirs.iter().map(|d| d.to_lowercase()).collect(),
            extensions: trackable_extensions(include_globs),
            output_dirs: Vec::new(),
        }
    }

    /// True if `rel` lies in ctxpack's own output, or any segment names an
    /// excluded directory (case-insensitive).
    pub fn is_excluded(&self, rel: &Path) -> bool {
        if self.output_dirs.iter().any(|dir| rel.starts_with(dir)) {
            return true;
        }
        rel.components().any(|c| {
            let segment = c.as_os_str().to_string_lossy();
            self.is_excluded_dir_name(&segment)
        })
    }

    /// True if `name` is the state directory or a configured excluded directory name.
    pub fn is_excluded_dir_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        name == STATE_DIR || self.exclude_dirs.iter().any(|ex| *ex == name)
    }

    /// Match a `/`-separated relative path against the include globs.
    ///
    /// A leading `**/` is optional, so `**/*.md` also matches `README.md`.
    pub fn matches_include(&self, rel_posix: &str) -> bool {
        if self.include.is_empty() {
            return true;
        }
        self.include.iter().any(|pattern| {
            if glob_matches(pattern, rel_posix) {
                return true;
            }
            pattern
                .strip_prefix("**/")
                .is_some_and(|rest| glob_matches(rest, rel_posix))
        })
    }

    /// Exclusion first, then inclusion.
    pub fn accepts(&self, rel: &Path) -> bool {
        !self.is_excluded(rel) && self.matches_include(&to_posix(rel))
    }

    /// Whether a change to `path` (absolute, under `root`) should enter the pending set.
    pub fn is_trackable(&self, path: &Path, root: &Path) -> bool {
        let path_str = path.to_string_lossy();
        if IGNORE_SUFFIXES.iter().any(|suffix| path_str.ends_with(suffix)) {
            return false;
        }
        let Ok(rel) = path.strip_prefix(root) else {
            return false;
        };
        if self.is_excluded(rel) {
            return false;
        }
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }

    #[cfg(test)]
    pub fn extensions(&self) -> &BTreeSet<String> {
        &self.extensions
    }
}

/// Derive the tracked extensions from `*.<ext>` include globs.
fn trackable_extensions(include_globs: &[String]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for glob in include_globs {
        let glob = glob.trim();
        if glob.is_empty() || !glob.contains("*.") {
            continue;
        }
        let Some((_, ext)) = glob.rsplit_once('.') else {
            continue;
        };
        let ext = ext.trim().to_lowercase();
        if ext.is_empty() || ext.contains(GLOB_META) {
            continue;
        }
        out.insert(ext);
    }
    if out.is_empty() {
        out.extend(FALLBACK_EXTENSIONS.iter().map(|e| e.to_string()));
    }
    out
}

/// Shell-style match where `*` may cross `/`.
fn glob_matches(pattern: &str, candidate: &str) -> bool {
    glob::Pattern::new(pattern)
        .map(|p| p.matches(candidate))
        .unwrap_or(false)
}

/// Render a relative path with `/` separators.
pub fn to_posix(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
