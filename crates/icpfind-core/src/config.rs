//! Configuration management for icpfind.
//!
//! Configuration is layered. The CLI applies its flags and environment
//! variables on top of whatever [`Config::load`] returns, and the result is
//! threaded into the retrieval engine as a plain [`RetrievalConfig`] value.
//! Nothing in the retrieval loop reads global state.
//!
//! ## File Location
//!
//! `ICPFIND_CONFIG` wins when set. Otherwise the platform config directory is
//! used:
//! - Linux: `~/.config/icpfind/config.toml`
//! - macOS: `~/Library/Application Support/dev.icpfind.icpfind/config.toml`
//! - Windows: `%APPDATA%\icpfind\icpfind\config\config.toml`
//!
//! ## Example Configuration File
//!
//! ```toml
//! [api]
//! base_url = "https://quake.360.net"
//! token = "..."
//!
//! [retrieval]
//! page_size = 20
//! max_iterations = 100
//! iteration_delay_secs = 0.2
//! retry_delay_secs = 2.0
//!
//! [paths]
//! cache_file = "quake_icp_cache_list.json"
//! ```

use crate::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default search backend base URL.
pub const DEFAULT_BASE_URL: &str = "https://quake.360.net";
/// Default cache file, relative to the working directory.
pub const DEFAULT_CACHE_FILE: &str = "quake_icp_cache_list.json";
/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ICPFIND_CONFIG";

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Search backend connection settings
    pub api: ApiConfig,
    /// Retrieval loop knobs
    pub retrieval: RetrievalConfig,
    /// File locations
    pub paths: PathsConfig,
}

/// Search backend connection settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL; the search path is appended by the client.
    pub base_url: String,
    /// API token. Usually supplied through `QUAKE_API_KEY` instead.
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
        }
    }
}

/// File locations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Persistent JSON cache of entity filings.
    pub cache_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
        }
    }
}

/// Knobs for one retrieval run.
///
/// Delays are stored as fractional seconds to match the command line
/// (`--delay 0.2`); use the `*_duration` accessors in code.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Records requested per page.
    pub page_size: u32,
    /// Iteration budget per entity.
    pub max_iterations: u32,
    /// Pause between consecutive page requests.
    pub iteration_delay_secs: f64,
    /// First back-off after a rate-limited response.
    pub retry_delay_secs: f64,
    /// Ceiling for the exponential rate-limit back-off.
    pub max_retry_delay_secs: f64,
    /// Consecutive rate-limited responses tolerated for one iteration.
    pub max_rate_limit_retries: u32,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_iterations: 100,
            iteration_delay_secs: 0.2,
            retry_delay_secs: 2.0,
            max_retry_delay_secs: 60.0,
            max_rate_limit_retries: 10,
            request_timeout_secs: 60,
        }
    }
}

impl RetrievalConfig {
    /// Reject values the retrieval loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("page size must be at least 1".into()));
        }
        if self.max_iterations == 0 {
            return Err(Error::Config("max iterations must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request timeout must be at least 1 second".into()));
        }
        for (name, value) in [
            ("iteration delay", self.iteration_delay_secs),
            ("retry delay", self.retry_delay_secs),
            ("max retry delay", self.max_retry_delay_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "{name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Pause between consecutive page requests.
    pub fn iteration_delay(&self) -> Duration {
        secs(self.iteration_delay_secs)
    }

    /// Back-off before the `attempt`-th retry (1-based) of a rate-limited page.
    ///
    /// Doubles per attempt starting at `retry_delay_secs`, capped at
    /// `max_retry_delay_secs`.
    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let raw = self.retry_delay_secs * 2f64.powi(exponent);
        secs(raw.min(self.max_retry_delay_secs.max(self.retry_delay_secs)))
    }

    /// Per-request timeout.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl Config {
    /// Load configuration from `ICPFIND_CONFIG` or the default location.
    ///
    /// A missing file yields defaults; an unreadable or malformed one is an
    /// error, since silently ignoring a config the user wrote would be worse.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config {}: {e}", path.display())))
    }

    /// Resolved config file path, if one can be determined.
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        directories::ProjectDirs::from("dev", "icpfind", "icpfind")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "https://quake.360.net");
        assert_eq!(config.retrieval.page_size, 20);
        assert_eq!(config.retrieval.max_iterations, 100);
        assert_eq!(config.retrieval.iteration_delay(), Duration::from_millis(200));
        assert_eq!(config.retrieval.rate_limit_delay(1), Duration::from_secs(2));
        assert_eq!(config.retrieval.request_timeout(), Duration::from_secs(60));
        assert_eq!(
            config.paths.cache_file,
            PathBuf::from("quake_icp_cache_list.json")
        );
        assert!(config.retrieval.validate().is_ok());
    }

    #[test]
    fn test_rate_limit_backoff_doubles_and_caps() {
        let config = RetrievalConfig {
            retry_delay_secs: 2.0,
            max_retry_delay_secs: 10.0,
            ..RetrievalConfig::default()
        };
        assert_eq!(config.rate_limit_delay(1), Duration::from_secs(2));
        assert_eq!(config.rate_limit_delay(2), Duration::from_secs(4));
        assert_eq!(config.rate_limit_delay(3), Duration::from_secs(8));
        assert_eq!(config.rate_limit_delay(4), Duration::from_secs(10));
        assert_eq!(config.rate_limit_delay(40), Duration::from_secs(10));
    }

    #[test]
    fn test_validation_rejects_unusable_values() {
        let bad = [
            RetrievalConfig {
                page_size: 0,
                ..RetrievalConfig::default()
            },
            RetrievalConfig {
                max_iterations: 0,
                ..RetrievalConfig::default()
            },
            RetrievalConfig {
                iteration_delay_secs: -1.0,
                ..RetrievalConfig::default()
            },
            RetrievalConfig {
                retry_delay_secs: f64::NAN,
                ..RetrievalConfig::default()
            },
            RetrievalConfig {
                request_timeout_secs: 0,
                ..RetrievalConfig::default()
            },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(Error::Config(_))));
        }
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[retrieval]\npage_size = 50\n\n[paths]\ncache_file = \"/tmp/icp.json\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.retrieval.page_size, 50);
        assert_eq!(config.retrieval.max_iterations, 100);
        assert_eq!(config.paths.cache_file, PathBuf::from("/tmp/icp.json"));
        assert_eq!(config.api.token, None);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[retrieval\npage_size = ").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    proptest! {
        #[test]
        fn test_backoff_never_exceeds_cap(attempt in 1u32..200, base in 0.0f64..5.0, cap in 5.0f64..120.0) {
            let config = RetrievalConfig {
                retry_delay_secs: base,
                max_retry_delay_secs: cap,
                ..RetrievalConfig::default()
            };
            prop_assert!(config.rate_limit_delay(attempt) <= Duration::from_secs_f64(cap));
        }
    }
}
