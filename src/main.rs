mod cli;
mod commands;
mod config;
mod error;
mod filter;
mod index;
mod pack;
mod refresh;
mod scope;
mod walker;
mod watcher;

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::pack::PackArgs;
use error::CliError;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<CliError>() {
            Some(cli_err) => {
                error!("{cli_err}");
                ExitCode::from(cli_err.exit_code())
            }
            None => {
                error!("{err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Pack {
            scope,
            path,
            max_kb,
            max_bytes,
            out,
            symbols_per_file,
            refresh_index,
            root,
        } => commands::pack::cmd_pack(PackArgs {
            scope,
            path,
            max_kb,
            max_bytes,
            out,
            symbols_per_file,
            refresh_index,
            root,
        }),
        Commands::Watch {
            debounce_ms,
            poll,
            root,
        } => commands::watch::cmd_watch(&root, debounce_ms, poll),
        Commands::Index { paths, root } => commands::index::cmd_index(&root, &paths),
    }
}
