//! icpfind CLI - exhaustive ICP filing lookup via the Quake search API
//!
//! Parses arguments, resolves settings, and dispatches to one of the three
//! modes. All retrieval logic lives in `icpfind-core`.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use icpfind_core::CacheStore;
use is_terminal::IsTerminal;

mod cli;
mod commands;
pub mod error;
mod output;
mod settings;
mod utils;

use cli::{Cli, Mode};
use output::OutputFormat;
use settings::Settings;
use utils::initialize_logging;

/// Execute the icpfind CLI with the current process arguments and
/// environment.
///
/// # Errors
///
/// Returns an error for usage problems and unexpected failures. Per-entity
/// failures are reported in the output and reflected in the returned exit
/// code instead.
pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    initialize_logging(&cli)?;

    let mode = cli.mode()?;
    let settings = Settings::resolve(&cli)?;
    let store = CacheStore::new(&settings.cache_file);

    match mode {
        Mode::Search(term) => {
            commands::search_cache(&store, &term, cli.format)?;
            Ok(ExitCode::SUCCESS)
        },
        Mode::Summarize => {
            commands::summarize_cache(&store, cli.format)?;
            Ok(ExitCode::SUCCESS)
        },
        Mode::Query(entities) => {
            let show_progress = cli.format == OutputFormat::Text
                && !cli.quiet
                && std::io::stderr().is_terminal();
            commands::query_entities(&entities, &settings, cli.format, show_progress).await
        },
    }
}
