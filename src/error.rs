//! # Error Handling
//!
//! This module defines the centralized error type for `depsize`. It uses the
//! `thiserror` library to create a single `Error` enum that covers every
//! anticipated failure mode of the harvesting pipeline.
//!
//! ## Failure categories
//!
//! The pipeline distinguishes two kinds of failures:
//!
//! - **Per-item failures**: transport or parsing errors from either GraphQL
//!   service, non-zero exits or timeouts of the clone, fetch and line-count
//!   subprocesses, and manifest parse errors. These affect a single repository
//!   or dependency. Stages skip the item and leave its progress marker pending
//!   so the next run retries it.
//! - **Fatal failures**: store errors, missing configuration, lock poisoning
//!   and thread pool setup. These abort the run.
//!
//! [`Error::is_item_failure`] encodes this split.

use thiserror::Error;

/// Main error type for depsize operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A GraphQL service answered with something other than a usable payload.
    #[error("{service} API error: {message}")]
    Api { service: String, message: String },

    /// A GraphQL service returned an `errors` array.
    #[error("{service} GraphQL errors: {}", messages.join("; "))]
    GraphQl {
        service: String,
        messages: Vec<String>,
    },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An external command exited unsuccessfully.
    #[error("Command `{program}` failed ({status}): {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    /// An external command exceeded its time budget and was killed.
    #[error("Command `{program}` timed out after {seconds} seconds")]
    CommandTimeout { program: String, seconds: u64 },

    /// An error occurred while cloning a repository.
    #[error("Git clone error for {url}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// A dependency manifest could not be parsed.
    #[error("Manifest parse error at line {line}: {message}")]
    ManifestParse { line: usize, message: String },

    /// A repository or module identifier could not be normalized.
    #[error("Invalid identifier `{input}`: {message}")]
    Identifier { input: String, message: String },

    /// The persisted store rejected an operation.
    #[error("Store error: {message}")]
    Store { message: String },

    /// The line-counting tool produced unusable output.
    #[error("Line count error for {path}: {message}")]
    LineCount { path: String, message: String },

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// The worker pool could not be built.
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Whether this error only concerns the item being processed.
    ///
    /// Per-item failures are skipped (or escalated, under the fail-fast
    /// policy); everything else aborts the run.
    pub fn is_item_failure(&self) -> bool {
        matches!(
            self,
            Error::Api { .. }
                | Error::GraphQl { .. }
                | Error::Http(_)
                | Error::Command { .. }
                | Error::CommandTimeout { .. }
                | Error::GitClone { .. }
                | Error::ManifestParse { .. }
                | Error::Identifier { .. }
                | Error::LineCount { .. }
                | Error::Json(_)
                | Error::Io(_)
        )
    }

    pub(crate) fn poisoned(context: &str) -> Self {
        Error::LockPoisoned {
            context: context.to_string(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_git_clone_with_hint() {
        let error = Error::GitClone {
            url: "https://github.com/test/repo.git".to_string(),
            message: "Authentication failed".to_string(),
            hint: Some("Check credentials".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Git clone error"));
        assert!(display.contains("https://github.com/test/repo.git"));
        assert!(display.contains("hint:"));
        assert!(display.contains("Check credentials"));
    }

    #[test]
    fn test_error_display_graphql_joins_messages() {
        let error = Error::GraphQl {
            service: "GitHub".to_string(),
            messages: vec!["rate limited".to_string(), "try later".to_string()],
        };
        assert_eq!(
            format!("{}", error),
            "GitHub GraphQL errors: rate limited; try later"
        );
    }

    #[test]
    fn test_error_display_timeout() {
        let error = Error::CommandTimeout {
            program: "git".to_string(),
            seconds: 120,
        };
        let display = format!("{}", error);
        assert!(display.contains("`git`"));
        assert!(display.contains("120 seconds"));
    }

    #[test]
    fn test_error_display_manifest_parse() {
        let error = Error::ManifestParse {
            line: 4,
            message: "unknown directive `frobnicate`".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("line 4"));
        assert!(display.contains("frobnicate"));
    }

    #[test]
    fn test_item_failures_are_classified() {
        assert!(Error::CommandTimeout {
            program: "go".to_string(),
            seconds: 1
        }
        .is_item_failure());
        assert!(Error::Api {
            service: "Sourcegraph".to_string(),
            message: "bad gateway".to_string()
        }
        .is_item_failure());
        assert!(Error::ManifestParse {
            line: 1,
            message: "x".to_string()
        }
        .is_item_failure());
    }

    #[test]
    fn test_fatal_failures_are_classified() {
        assert!(!Error::Store {
            message: "disk full".to_string()
        }
        .is_item_failure());
        assert!(!Error::Config {
            message: "missing token".to_string()
        }
        .is_item_failure());
        assert!(!Error::poisoned("dependency map").is_item_failure());
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(format!("{}", error).contains("JSON error"));
    }
}
