//! # Run Configuration
//!
//! [`Settings`] gathers every value the pipeline reads at startup: service
//! credentials and endpoints, worker pool width, scratch and store
//! locations, the per-command timeout and the failure policy. The CLI builds
//! it from flags with environment variable fallbacks; after
//! [`Settings::validate`] it is treated as immutable for the whole run.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::defaults;
use crate::error::{Error, Result};
use crate::process::DEFAULT_TIMEOUT;

/// What a stage does when a single repository fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure, leave the repository's marker pending, continue.
    #[default]
    Skip,
    /// Abort the stage with the first failure.
    FailFast,
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(FailurePolicy::Skip),
            "fail-fast" | "failfast" => Ok(FailurePolicy::FailFast),
            other => Err(Error::Config {
                message: format!("unknown failure policy `{}` (expected skip or fail-fast)", other),
            }),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Skip => write!(f, "skip"),
            FailurePolicy::FailFast => write!(f, "fail-fast"),
        }
    }
}

/// The language ecosystem being harvested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ecosystem {
    /// Search language filter.
    pub language: String,
    /// Manifest file a repository must carry.
    pub manifest_file: String,
}

impl Default for Ecosystem {
    fn default() -> Self {
        Self {
            language: "go".to_string(),
            manifest_file: crate::manifest::MANIFEST_FILE.to_string(),
        }
    }
}

/// Knobs the pipeline stages consult.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub workers: usize,
    pub scratch_root: PathBuf,
    pub failure_policy: FailurePolicy,
    pub ecosystem: Ecosystem,
    /// Also feed stored rows with pending markers into the stages.
    pub resume_pending: bool,
    /// Resolve dependencies on the worker pool instead of serially.
    pub parallel_resolution: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: defaults::default_workers(),
            scratch_root: defaults::default_scratch_root(),
            failure_policy: FailurePolicy::default(),
            ecosystem: Ecosystem::default(),
            resume_pending: true,
            parallel_resolution: false,
        }
    }
}

/// Credentials and endpoint of the metadata service.
#[derive(Clone, PartialEq, Eq)]
pub struct GitHubSettings {
    pub endpoint: String,
    pub token: String,
    pub username: String,
}

impl fmt::Debug for GitHubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubSettings")
            .field("endpoint", &self.endpoint)
            .field("token", &"***")
            .field("username", &self.username)
            .finish()
    }
}

/// Endpoint and optional token of the search service.
#[derive(Clone, PartialEq, Eq)]
pub struct SourcegraphSettings {
    pub endpoint: String,
    pub token: Option<String>,
}

impl fmt::Debug for SourcegraphSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourcegraphSettings")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Everything read at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub github: GitHubSettings,
    pub sourcegraph: SourcegraphSettings,
    pub store_path: PathBuf,
    pub command_timeout: Duration,
    pub line_counter: String,
    pub pipeline: PipelineOptions,
}

impl Settings {
    /// Reject configurations the pipeline cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.github.token.trim().is_empty() {
            return Err(Error::Config {
                message: format!(
                    "a GitHub token is required (set {})",
                    defaults::ENV_GITHUB_TOKEN
                ),
            });
        }
        for (name, endpoint) in [
            ("GitHub", &self.github.endpoint),
            ("Sourcegraph", &self.sourcegraph.endpoint),
        ] {
            url::Url::parse(endpoint).map_err(|e| Error::Config {
                message: format!("{} endpoint `{}` is not a URL: {}", name, endpoint, e),
            })?;
        }
        if self.pipeline.workers == 0 {
            return Err(Error::Config {
                message: "worker count must be at least 1".to_string(),
            });
        }
        if self.command_timeout.is_zero() {
            return Err(Error::Config {
                message: "command timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            github: GitHubSettings {
                endpoint: defaults::GITHUB_GRAPHQL_API.to_string(),
                token: String::new(),
                username: String::new(),
            },
            sourcegraph: SourcegraphSettings {
                endpoint: defaults::SOURCEGRAPH_GRAPHQL_API.to_string(),
                token: None,
            },
            store_path: defaults::default_store_path(),
            command_timeout: DEFAULT_TIMEOUT,
            line_counter: defaults::LINE_COUNTER.to_string(),
            pipeline: PipelineOptions::default(),
        }
    }
}
