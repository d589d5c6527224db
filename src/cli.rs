use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::scope::Scope;

/// Keep a lightweight file index fresh and emit byte-budgeted context packs.
///
/// ctxpack selects files by scope (git staged/changed, a path, or the most
/// recently modified), and renders a compact markdown digest that never
/// exceeds the requested size.
#[derive(Parser, Debug)]
#[command(
    name = "ctxpack",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a context pack for the selected scope.
    ///
    /// Exits with status 2 when arguments are invalid or no file matches.
    Pack {
        /// Which files to include.
        #[arg(long, value_enum, default_value_t = Scope::Staged)]
        scope: Scope,

        /// File or directory for --scope=path (relative to the root).
        #[arg(long, required_if_eq("scope", "path"))]
        path: Option<String>,

        /// Size ceiling in KiB (minimum 4).
        #[arg(long, default_value_t = 24)]
        max_kb: u64,

        /// Exact size ceiling in bytes; overrides --max-kb.
        #[arg(long, conflicts_with = "max_kb", value_parser = clap::value_parser!(u64).range(64..))]
        max_bytes: Option<u64>,

        /// Output file (relative to the root).
        #[arg(long, default_value = ".ctxpack/PACK.md")]
        out: PathBuf,

        /// Maximum symbols listed per file.
        #[arg(long, default_value_t = 5)]
        symbols_per_file: usize,

        /// Reindex the selected files before packing.
        #[arg(long)]
        refresh_index: bool,

        /// Project root.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },

    /// Watch the project and refresh the index as files settle. Runs until Ctrl+C.
    Watch {
        /// Quiet period in milliseconds before a change is processed (clamped to 300-1000).
        #[arg(long, default_value_t = 400)]
        debounce_ms: u64,

        /// Use mtime polling instead of OS notifications.
        #[arg(long)]
        poll: bool,

        /// Project root.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },

    /// Reindex files once and summarize, like a single watch batch.
    Index {
        /// Repo-relative files to reindex. Defaults to every trackable file.
        paths: Vec<String>,

        /// Project root.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}
