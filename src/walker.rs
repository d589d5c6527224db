use std::path::{Path, PathBuf};

use tracing::debug;

use crate::filter::PathFilter;

/// Directory-name rules the polling watcher always applies, on top of the
/// configured exclusions: large build output and scratch directories.
pub fn is_scratch_dir_name(name: &str) -> bool {
    let name = name.to_lowercase();
    name.starts_with("tmp") || name == "release" || name == "releases"
}

/// Walk `start` recursively and collect regular files.
///
/// Directories rejected by `prune_dir` are not descended into. `.gitignore`
/// rules are deliberately not applied: selection is driven by the include
/// globs and excluded directory names alone.
pub fn walk_files(start: &Path, prune_dir: impl Fn(&str) -> bool + Send + Sync + 'static) -> Vec<PathBuf> {
    let walker = ignore::WalkBuilder::new(start)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
            if !is_dir {
                return true;
            }
            entry
                .file_name()
                .to_str()
                .map(|name| !prune_dir(name))
                .unwrap_or(true)
        })
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                debug!("walk error: {err}");
                continue;
            }
        };
        if entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            files.push(entry.into_path());
        }
    }
    files
}

/// Walk a directory for scope resolution, pruning configured excluded directories.
pub fn walk_scope_dir(dir: &Path, filter: &PathFilter) -> Vec<PathBuf> {
    let filter = filter.clone();
    walk_files(dir, move |name| filter.is_excluded_dir_name(name))
}

/// Walk the whole tree for the polling watcher: configured exclusions plus
/// the fixed scratch-directory rules, applied independently.
pub fn walk_for_polling(root: &Path, filter: &PathFilter) -> Vec<PathBuf> {
    let filter = filter.clone();
    walk_files(root, move |name| {
        filter.is_excluded_dir_name(name) || is_scratch_dir_name(name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("tempdir")
    }

    fn names(files: &[PathBuf], root: &Path) -> Vec<String> {
        let mut out: Vec<String> = files
            .iter()
            .map(|f| crate::filter::to_posix(f.strip_prefix(root).unwrap()))
            .collect();
        out.sort();
        out
    }

    fn filter(exclude: &[&str]) -> PathFilter {
        let exclude: Vec<String> = exclude.iter().map(|s| s.to_string()).collect();
        PathFilter::from_parts(&[], &exclude)
    }

    #[test]
    fn test_scope_walk_prunes_configured_dirs() {
        let dir = tmp();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "export {}").unwrap();
        fs::write(dir.path().join("node_modules/pkg/b.ts"), "export {}").unwrap();

        let files = walk_scope_dir(dir.path(), &filter(&["node_modules"]));
        assert_eq!(names(&files, dir.path()), vec!["src/a.ts"]);
    }

    #[test]
    fn test_scope_walk_keeps_scratch_named_dirs() {
        let dir = tmp();
        fs::create_dir_all(dir.path().join("tmpl")).unwrap();
        fs::write(dir.path().join("tmpl/page.md"), "# page").unwrap();

        let files = walk_scope_dir(dir.path(), &filter(&[]));
        assert_eq!(names(&files, dir.path()), vec!["tmpl/page.md"]);
    }

    #[test]
    fn test_polling_walk_prunes_scratch_and_configured_dirs() {
        let dir = tmp();
        for sub in ["src", "Release", "releases", "tmp-out", "vendor"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
            fs::write(dir.path().join(sub).join("f.md"), "x").unwrap();
        }

        let files = walk_for_polling(dir.path(), &filter(&["vendor"]));
        assert_eq!(names(&files, dir.path()), vec!["src/f.md"]);
    }

    #[test]
    fn test_walk_includes_hidden_and_gitignored_files() {
        let dir = tmp();
        fs::write(dir.path().join(".gitignore"), "ignored.md\n").unwrap();
        fs::write(dir.path().join("ignored.md"), "x").unwrap();
        fs::write(dir.path().join(".hidden.md"), "x").unwrap();

        let files = walk_scope_dir(dir.path(), &filter(&[]));
        let found = names(&files, dir.path());
        assert!(found.contains(&"ignored.md".to_string()));
        assert!(found.contains(&".hidden.md".to_string()));
    }
}
