//! Repository records and their progress markers.
//!
//! Every metric on a [`Repository`] starts out [`Metric::Pending`] and is
//! filled exactly once by the stage responsible for it. Stages decide whether
//! a record still needs work solely by looking at their marker field, which is
//! what makes repeated runs resume instead of redoing completed work.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A metric that is either still to be computed or has a recorded value.
///
/// `Done` with an empty value (e.g. a repository without a license) is a
/// finished computation and is never confused with `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum Metric<T> {
    #[default]
    Pending,
    Done(T),
}

impl<T> Metric<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Metric::Pending)
    }

    pub fn is_done(&self) -> bool {
        !self.is_pending()
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Metric::Pending => None,
            Metric::Done(value) => Some(value),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Metric<T> {
    /// Renders the value, or an empty string while pending.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Pending => Ok(()),
            Metric::Done(value) => write!(f, "{}", value),
        }
    }
}

/// Type tag stored on enriched repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryKind {
    Primary,
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryKind::Primary => write!(f, "primary"),
        }
    }
}

/// The pipeline stages that fill in repository metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Enrichment,
    Measurement,
    Resolution,
}

/// One stored repository row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Store-assigned row id; zero until persisted.
    #[serde(default)]
    pub id: u64,
    /// Canonical repository name (last path segment).
    pub name: String,
    /// Canonical URL, the store's uniqueness key.
    pub url: String,
    #[serde(default)]
    pub open_issues: Metric<u64>,
    #[serde(default)]
    pub closed_issues: Metric<u64>,
    #[serde(default)]
    pub commit_count: Metric<u64>,
    #[serde(default)]
    pub own_code_lines: Metric<u64>,
    #[serde(default)]
    pub library_code_lines: Metric<u64>,
    #[serde(default)]
    pub stargazers: Metric<u64>,
    #[serde(default)]
    pub language_bytes: Metric<u64>,
    #[serde(default)]
    pub primary_language: Metric<String>,
    #[serde(default)]
    pub license: Metric<String>,
    #[serde(default)]
    pub created_at: Metric<String>,
    #[serde(default)]
    pub latest_release: Metric<String>,
    #[serde(default)]
    pub kind: Metric<RepositoryKind>,
}

impl Repository {
    /// A bare record as created by discovery: identity only, all metrics pending.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            url: url.into(),
            open_issues: Metric::Pending,
            closed_issues: Metric::Pending,
            commit_count: Metric::Pending,
            own_code_lines: Metric::Pending,
            library_code_lines: Metric::Pending,
            stargazers: Metric::Pending,
            language_bytes: Metric::Pending,
            primary_language: Metric::Pending,
            license: Metric::Pending,
            created_at: Metric::Pending,
            latest_release: Metric::Pending,
            kind: Metric::Pending,
        }
    }

    /// Whether `stage` still has work to do for this record.
    pub fn needs(&self, stage: Stage) -> bool {
        match stage {
            Stage::Enrichment => self.commit_count.is_pending(),
            Stage::Measurement => self.own_code_lines.is_pending(),
            Stage::Resolution => self.library_code_lines.is_pending(),
        }
    }

    /// Whether any stage still has work to do.
    pub fn is_incomplete(&self) -> bool {
        [Stage::Enrichment, Stage::Measurement, Stage::Resolution]
            .into_iter()
            .any(|stage| self.needs(stage))
    }
}
