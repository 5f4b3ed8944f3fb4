#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

#[allow(dead_code)]
fn config_dir() -> &'static Path {
    static CONFIG_DIR: OnceLock<TempDir> = OnceLock::new();
    CONFIG_DIR
        .get_or_init(|| tempfile::tempdir().expect("failed to create config dir for tests"))
        .path()
}

/// Create a configured `icpfind` command suitable for integration tests.
///
/// The user's config file and Quake environment variables are masked so
/// tests only see what they pass explicitly.
#[allow(dead_code)]
pub fn icpfind_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("icpfind"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env("ICPFIND_CONFIG", config_dir().join("absent.toml"));
    cmd.env_remove("QUAKE_API_KEY");
    cmd.env_remove("QUAKE_API_URL");
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Write a cache file into `dir` and return its path.
#[allow(dead_code)]
pub fn write_cache(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("cache.json");
    fs::write(&path, json).expect("failed to write cache fixture");
    path
}

/// Arguments pointing a query at a mock server with no delays.
#[allow(dead_code)]
pub fn query_args(server_uri: &str, cache: &Path) -> Vec<String> {
    vec![
        "-k".into(),
        "test-token".into(),
        "--api-url".into(),
        server_uri.into(),
        "--cache-file".into(),
        cache.display().to_string(),
        "--delay".into(),
        "0".into(),
        "--retry-delay".into(),
        "0.001".into(),
    ]
}
