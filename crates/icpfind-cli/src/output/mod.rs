//! # Output Formatting
//!
//! Every mode renders either human-readable text or a single JSON document on
//! stdout. Logs and the progress spinner go to stderr, so JSON output can be
//! piped straight into `jq`:
//!
//! ```bash
//! icpfind -f companies.txt --format json | jq '.summary'
//! ```
//!
//! - [`text`]: colored listings, records sorted by licence
//! - [`json`]: serializable report shapes
//! - [`progress`]: spinner fed by retrieval events

pub mod json;
pub mod progress;
pub mod text;

pub use progress::SpinnerObserver;

/// Output format options supported by the CLI
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty text output (default)
    Text,
    /// Single JSON document
    Json,
}
