//! Exit-code mapping for the `icpfind` binary.
//!
//! # Exit codes
//!
//! | Code | Category | Meaning |
//! |------|----------|---------|
//! | 0 | - | Every entity succeeded, or a cache-only mode ran |
//! | 1 | `Failure` | An entity failed or was skipped, or an unexpected error |
//! | 2 | `Usage` | Invalid arguments, missing token, bad configuration |
//!
//! ```bash
//! icpfind -f companies.txt || echo "exit $?: see the summary above"
//! ```

use std::fmt;
use std::process::ExitCode;

/// What kind of failure ended the run; decides the exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Retrieval failed or something unexpected happened (exit code 1).
    Failure = 1,

    /// Invalid arguments or configuration (exit code 2).
    ///
    /// Raised before any request is sent.
    Usage = 2,
}

impl ErrorCategory {
    /// Numeric exit code.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        self as u8
    }

    /// As a process `ExitCode`.
    #[must_use]
    pub fn as_exit_code(self) -> ExitCode {
        ExitCode::from(self.exit_code())
    }

    /// Human label.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Failure => "failure",
            Self::Usage => "usage error",
        }
    }

    /// Category for a library error.
    #[must_use]
    pub const fn from_core(err: &icpfind_core::Error) -> Self {
        match err {
            icpfind_core::Error::Config(_) => Self::Usage,
            _ => Self::Failure,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// An error tagged with the [`ErrorCategory`] that `main` turns into an exit
/// code.
#[derive(Debug)]
pub struct CliError {
    /// Exit-code category.
    pub category: ErrorCategory,
    /// Wrapped error.
    pub source: anyhow::Error,
}

impl CliError {
    /// Tag `source` with `category`.
    pub fn new(category: ErrorCategory, source: impl Into<anyhow::Error>) -> Self {
        Self {
            category,
            source: source.into(),
        }
    }

    /// Exit code 2.
    pub fn usage(source: impl Into<anyhow::Error>) -> Self {
        Self::new(ErrorCategory::Usage, source)
    }

    /// Exit code 1.
    pub fn failure(source: impl Into<anyhow::Error>) -> Self {
        Self::new(ErrorCategory::Failure, source)
    }

    /// Exit code of the category.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.category.exit_code()
    }
}

impl From<icpfind_core::Error> for CliError {
    fn from(err: icpfind_core::Error) -> Self {
        Self::new(ErrorCategory::from_core(&err), err)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Exit code for an error bubbled up to `main`.
///
/// Explicit `CliError`s keep their category, library errors are categorized
/// by variant, and anything else is a failure.
#[must_use]
pub fn exit_code_from_error(err: &anyhow::Error) -> u8 {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return cli_err.exit_code();
    }
    if let Some(core_err) = err.downcast_ref::<icpfind_core::Error>() {
        return ErrorCategory::from_core(core_err).exit_code();
    }
    ErrorCategory::Failure.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ErrorCategory::Failure.exit_code(), 1);
        assert_eq!(ErrorCategory::Usage.exit_code(), 2);
    }

    #[test]
    fn test_core_errors_are_categorized() {
        let config = icpfind_core::Error::Config("no token".into());
        let quota = icpfind_core::Error::QuotaExhausted {
            message: "credits".into(),
        };
        assert_eq!(ErrorCategory::from_core(&config), ErrorCategory::Usage);
        assert_eq!(ErrorCategory::from_core(&quota), ErrorCategory::Failure);
    }

    #[test]
    fn test_exit_code_from_error() {
        let err = anyhow::Error::new(CliError::usage(anyhow!("bad flag")));
        assert_eq!(exit_code_from_error(&err), 2);

        let err = anyhow::Error::new(icpfind_core::Error::Config("bad".into()));
        assert_eq!(exit_code_from_error(&err), 2);

        let err = anyhow::Error::new(icpfind_core::Error::Timeout("60s".into()));
        assert_eq!(exit_code_from_error(&err), 1);

        assert_eq!(exit_code_from_error(&anyhow!("boom")), 1);
    }

    #[test]
    fn test_display_preserves_message() {
        let err = CliError::failure(anyhow!("request failed"));
        assert_eq!(err.to_string(), "request failed");
        assert_eq!(err.category.to_string(), "failure");
    }
}
