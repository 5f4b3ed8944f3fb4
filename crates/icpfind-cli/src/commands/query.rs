//! Query command implementation

use std::process::ExitCode;

use anyhow::Result;
use icpfind_core::{CacheStore, IcpFinder, QuakeClient};

use crate::error::{CliError, ErrorCategory};
use crate::output::{OutputFormat, SpinnerObserver, json, text};
use crate::settings::Settings;

/// Execute the query command for `entities`, in order.
///
/// Exits 0 only when every entity succeeded.
pub async fn execute(
    entities: &[String],
    settings: &Settings,
    format: OutputFormat,
    show_progress: bool,
) -> Result<ExitCode> {
    let token = settings.require_token()?;
    let client = QuakeClient::new(
        &settings.base_url,
        token,
        settings.retrieval.request_timeout(),
    )
    .map_err(CliError::from)?;

    let observer = SpinnerObserver::new(show_progress);
    let spinner = observer.bar();
    let finder = IcpFinder::new(
        client,
        settings.retrieval.clone(),
        CacheStore::new(&settings.cache_file),
    )
    .map_err(CliError::from)?
    .with_observer(Box::new(observer));

    let report = finder.find_all(entities).await;
    spinner.finish_and_clear();

    match format {
        OutputFormat::Text => println!("{}", text::render_query_report(&report)),
        OutputFormat::Json => json::print(&json::QueryReport::new(&report))?,
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ErrorCategory::Failure.as_exit_code()
    })
}
