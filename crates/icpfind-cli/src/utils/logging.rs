//! Tracing subscriber and colour setup.

use anyhow::Result;
use colored::control as color_control;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::cli::Cli;
use crate::output::OutputFormat;

/// Pick the log level for the given flags.
///
/// JSON output lowers the default to errors only so stderr stays quiet for
/// scripts, unless verbosity was asked for explicitly.
pub fn log_level(cli: &Cli) -> Level {
    if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else if cli.quiet || cli.format == OutputFormat::Json {
        Level::ERROR
    } else {
        Level::WARN
    }
}

/// Install a stderr subscriber at [`log_level`] and apply colour overrides.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn initialize_logging(cli: &Cli) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(cli))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let no_color_env = std::env::var_os("NO_COLOR").is_some();
    if cli.no_color || no_color_env || cli.format == OutputFormat::Json {
        color_control::set_override(false);
    }
    Ok(())
}
