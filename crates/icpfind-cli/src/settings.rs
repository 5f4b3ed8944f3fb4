//! Effective settings: command-line flags over environment over config file
//! over built-in defaults.
//!
//! Environment variables for the token and base URL are folded in by clap
//! (`QUAKE_API_KEY`, `QUAKE_API_URL`), so by the time [`Settings::resolve`]
//! runs a flag and its variable are already one value.

use std::path::PathBuf;

use icpfind_core::{Config, RetrievalConfig};

use crate::cli::Cli;
use crate::error::CliError;

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Search backend base URL.
    pub base_url: String,
    /// API token, if any source supplied one.
    pub token: Option<String>,
    /// Cache file location.
    pub cache_file: PathBuf,
    /// Retrieval loop knobs.
    pub retrieval: RetrievalConfig,
}

impl Settings {
    /// Load the config file and apply `cli` on top.
    pub fn resolve(cli: &Cli) -> Result<Self, CliError> {
        let config = Config::load()?;
        let settings = Self::layer(config, cli);
        settings.retrieval.validate()?;
        Ok(settings)
    }

    fn layer(config: Config, cli: &Cli) -> Self {
        let Config {
            api,
            mut retrieval,
            paths,
        } = config;

        if let Some(size) = cli.batch_size {
            retrieval.page_size = size;
        }
        if let Some(max) = cli.max_iterations {
            retrieval.max_iterations = max;
        }
        if let Some(delay) = cli.delay {
            retrieval.iteration_delay_secs = delay;
        }
        if let Some(delay) = cli.retry_delay {
            retrieval.retry_delay_secs = delay;
            // An explicit first back-off above the configured ceiling wins.
            retrieval.max_retry_delay_secs = retrieval.max_retry_delay_secs.max(delay);
        }
        if let Some(retries) = cli.max_retries {
            retrieval.max_rate_limit_retries = retries;
        }
        if let Some(timeout) = cli.timeout {
            retrieval.request_timeout_secs = timeout;
        }

        let token = cli
            .apikey
            .clone()
            .or(api.token)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Self {
            base_url: cli.api_url.clone().unwrap_or(api.base_url),
            token,
            cache_file: cli.cache_file.clone().unwrap_or(paths.cache_file),
            retrieval,
        }
    }

    /// The token, or a usage error explaining how to supply one.
    pub fn require_token(&self) -> Result<&str, CliError> {
        self.token.as_deref().ok_or_else(|| {
            CliError::usage(anyhow::anyhow!(
                "a Quake API token is required: pass --apikey/-k, set QUAKE_API_KEY, \
                 or add `token` under [api] in the config file"
            ))
        })
    }
}
