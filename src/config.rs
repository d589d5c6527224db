use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

/// Name of the configuration file looked up at the project root.
pub const CONFIG_FILE: &str = "ctxpack.toml";

/// Directory (relative to the root) holding ctxpack's own state.
pub const STATE_DIR: &str = ".ctxpack";

/// Configuration loaded from `ctxpack.toml` at the project root.
///
/// Every key is optional; missing keys fall back to the defaults below.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Display name used in pack headers. Defaults to the root directory name.
    pub project_name: Option<String>,
    /// Inclusion globs matched against repo-relative `/`-separated paths.
    pub include_globs: Vec<String>,
    /// Directory names excluded anywhere in a path (case-insensitive).
    pub exclude_dirs: Vec<String>,
    /// How many files the `recent` scope selects.
    pub max_recent_files: usize,
    /// Index file, relative to the root.
    pub index_path: PathBuf,
    /// Optional complexity report, relative to the root.
    pub complexity_report: PathBuf,
    /// Where the built-in summarize step writes the recent-scope pack.
    pub latest_context: PathBuf,
    /// Byte budget (in KiB) for the built-in summarize pack.
    pub latest_max_kb: u64,
    /// External reindex command; the repo-relative path is appended as the last argument.
    pub reindex_command: Option<Vec<String>>,
    /// External summarize command.
    pub summarize_command: Option<Vec<String>>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_name: None,
            include_globs: [
                "**/*.rs", "**/*.toml", "**/*.md", "**/*.ts", "**/*.tsx", "**/*.js", "**/*.jsx",
                "**/*.json", "**/*.yml", "**/*.yaml", "**/*.py",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            exclude_dirs: [".git", "node_modules", "target", "dist", "build", STATE_DIR]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_recent_files: 12,
            index_path: Path::new(STATE_DIR).join("index.bin"),
            complexity_report: Path::new(STATE_DIR).join("reports").join("complexity.json"),
            latest_context: Path::new(STATE_DIR).join("LATEST_CONTEXT.md"),
            latest_max_kb: 16,
            reindex_command: None,
            summarize_command: None,
        }
    }
}

impl ProjectConfig {
    /// Load configuration from `ctxpack.toml` in the given root directory.
    ///
    /// Returns the default configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    warn!("failed to parse {CONFIG_FILE}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                warn!("failed to read {CONFIG_FILE}: {err}. Using defaults.");
                Self::default()
            }
        }
    }

    /// The configured project name, or the root directory's file name.
    pub fn project_name(&self, root: &Path) -> String {
        self.project_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| {
                root.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "project".to_string())
    }
}
