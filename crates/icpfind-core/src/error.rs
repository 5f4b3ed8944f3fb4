//! Error types and handling for icpfind-core operations.
//!
//! This module provides a single error type that covers every way a retrieval
//! run can fail. Errors are categorized for reporting and carry a hint about
//! whether retrying later might help.
//!
//! ## Error Categories
//!
//! - **Configuration**: missing credentials, invalid knobs, bad entity names
//! - **Transport**: connection failures and request timeouts
//! - **Protocol**: responses that are not the expected JSON envelope
//! - **API**: non-success status codes reported by the search backend
//!   (quota exhausted, rate limited, query rejected, anything else)
//! - **Storage**: cache file reads and writes
//!
//! Conditions the retrieval loop recovers from locally (a rate-limited page
//! below the retry ceiling, a single malformed item, a corrupt cache file)
//! never surface as an [`Error`]; they are reported as events and log records.
//!
//! ## Recovery Hints
//!
//! ```rust
//! use icpfind_core::Error;
//!
//! let err = Error::RateLimited { attempts: 10 };
//! assert!(err.is_recoverable());
//! assert_eq!(err.category(), "rate_limited");
//!
//! let err = Error::QuotaExhausted { message: "insufficient credits".into() };
//! assert!(!err.is_recoverable());
//! ```

use thiserror::Error;

/// The main error type for icpfind-core operations.
///
/// Returned by every fallible public function in the crate. A retrieval run
/// that ends in `Err(_)` means the entity failed, as opposed to an `Ok` outcome
/// with zero records which means the entity simply has no filings.
#[derive(Error, Debug)]
pub enum Error {
    /// Network operation failed.
    ///
    /// Connection refused, DNS failure, TLS failure or an HTTP error status
    /// without a parseable API envelope. The underlying `reqwest::Error` is
    /// preserved.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A request exceeded its timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The backend answered with something that is not the expected envelope.
    ///
    /// ## Common Causes
    ///
    /// - HTML error pages from a proxy
    /// - Truncated bodies
    /// - A `data` field that is neither a list nor null
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The account has no query credits left.
    ///
    /// Retrying is pointless until the quota is replenished, and every
    /// following entity in a batch would hit the same condition.
    #[error("Quota exhausted: {message}")]
    QuotaExhausted {
        /// Message returned by the backend.
        message: String,
    },

    /// The backend kept rate limiting the same page past the retry ceiling.
    #[error("Rate limited: gave up after {attempts} consecutive retries")]
    RateLimited {
        /// Number of retries performed before giving up.
        attempts: u32,
    },

    /// The backend rejected the query syntax or failed internally.
    #[error("Query rejected (code {code}): {message}")]
    QueryRejected {
        /// API status code as reported.
        code: String,
        /// Message returned by the backend.
        message: String,
    },

    /// Any other non-success API status code.
    #[error("API error (code {code}): {message}")]
    Api {
        /// API status code as reported.
        code: String,
        /// Message returned by the backend.
        message: String,
    },

    /// Cache storage operation failed.
    ///
    /// Only writes surface this error; unreadable caches are treated as empty.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration is invalid or inaccessible.
    ///
    /// ## Common Causes
    ///
    /// - No API token in flags, environment or config file
    /// - Malformed TOML in the config file
    /// - Zero page size, zero iteration budget, negative delays
    /// - Blank entity names
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Check if the error might go away if the same run is attempted later.
    ///
    /// Returns `true` for transient transport conditions and for rate
    /// limiting; `false` for quota exhaustion, rejected queries, protocol and
    /// configuration problems.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout(_) | Self::RateLimited { .. } => true,
            _ => false,
        }
    }

    /// Get the error category as a string identifier.
    ///
    /// Used as a structured field in log records and in the CLI's JSON report.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::Protocol(_) => "protocol",
            Self::QuotaExhausted { .. } => "quota_exhausted",
            Self::RateLimited { .. } => "rate_limited",
            Self::QueryRejected { .. } => "query_rejected",
            Self::Api { .. } => "api",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
        }
    }

    /// Whether this failure should stop the remaining entities of a batch.
    #[must_use]
    pub const fn halts_batch(&self) -> bool {
        matches!(self, Self::QuotaExhausted { .. })
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
