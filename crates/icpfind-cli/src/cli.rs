//! # CLI Structure and Argument Parsing
//!
//! `icpfind` has three modes, picked by flags rather than subcommands:
//!
//! ```bash
//! # Query one entity, or every line of a file
//! icpfind "北京某某科技有限公司" -k $TOKEN
//! icpfind -f companies.txt
//!
//! # Print everything in the cache
//! icpfind -s
//!
//! # Case-insensitive search over cached entity names and domains
//! icpfind --search example
//! ```
//!
//! `--search` wins over `-s`, which wins over querying.

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CliError;
use crate::output::OutputFormat;

/// Main CLI structure for the `icpfind` command
#[derive(Parser, Clone, Debug)]
#[command(name = "icpfind")]
#[command(version)]
#[command(
    about = "icpfind - exhaustive ICP filing lookup via the Quake search API",
    long_about = None
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Entity (company) name to query
    #[arg(value_name = "ENTITY", conflicts_with = "file")]
    pub entity: Option<String>,

    /// File with one entity name per line
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Print every cached entity and its filings
    #[arg(short = 's', long)]
    pub summarize: bool,

    /// Search cached entity names and domains (case-insensitive)
    #[arg(long, value_name = "TERM")]
    pub search: Option<String>,

    /// Quake API token
    #[arg(
        short = 'k',
        long = "apikey",
        value_name = "TOKEN",
        env = "QUAKE_API_KEY",
        hide_env_values = true
    )]
    pub apikey: Option<String>,

    /// Quake API base URL
    #[arg(long, value_name = "URL", env = "QUAKE_API_URL")]
    pub api_url: Option<String>,

    /// Cache file location
    #[arg(long, value_name = "PATH")]
    pub cache_file: Option<PathBuf>,

    /// Records requested per page
    #[arg(long, value_name = "N")]
    pub batch_size: Option<u32>,

    /// Maximum pages per entity
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<u32>,

    /// Pause between pages, in seconds
    #[arg(long, value_name = "SECS")]
    pub delay: Option<f64>,

    /// First back-off after a rate-limited response, in seconds
    #[arg(long, value_name = "SECS")]
    pub retry_delay: Option<f64>,

    /// Consecutive rate-limited retries before giving up on an entity
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Per-request timeout, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Show progress details
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Show debug logs, including every request
    #[arg(long)]
    pub debug: bool,

    /// Only show errors
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Disable all ANSI colors in output (also respects `NO_COLOR` env)
    #[arg(long = "no-color")]
    pub no_color: bool,
}

/// What the invocation asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Search the cache for a term.
    Search(String),
    /// Print the whole cache.
    Summarize,
    /// Query these entities, in order.
    Query(Vec<String>),
}

impl Cli {
    /// Resolve the mode, reading the names file if one was given.
    pub fn mode(&self) -> Result<Mode, CliError> {
        if let Some(term) = &self.search {
            let term = term.trim();
            if term.is_empty() {
                return Err(CliError::usage(anyhow::anyhow!(
                    "search term must not be empty"
                )));
            }
            return Ok(Mode::Search(term.to_string()));
        }
        if self.summarize {
            return Ok(Mode::Summarize);
        }
        if let Some(path) = &self.file {
            return read_names(path).map(Mode::Query);
        }
        match self.entity.as_deref().map(str::trim) {
            Some(entity) if !entity.is_empty() => Ok(Mode::Query(vec![entity.to_string()])),
            Some(_) => Err(CliError::usage(anyhow::anyhow!(
                "entity name must not be empty"
            ))),
            None => Err(CliError::usage(anyhow::anyhow!(
                "nothing to do: pass an entity name, --file, --summarize or --search (see --help)"
            ))),
        }
    }
}

/// Read entity names, one per line; blank lines are ignored.
fn read_names(path: &Path) -> Result<Vec<String>, CliError> {
    let content = fs::read_to_string(path).map_err(|e| {
        CliError::usage(anyhow::anyhow!(
            "cannot read names file {}: {e}",
            path.display()
        ))
    })?;
    let names: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        return Err(CliError::usage(anyhow::anyhow!(
            "names file {} contains no entity names",
            path.display()
        )));
    }
    Ok(names)
}
