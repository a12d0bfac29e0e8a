//! Repository and module identifiers.
//!
//! Search results, stored URLs and manifest entries all name repositories in
//! slightly different shapes (`owner/name`, `github.com/owner/name`,
//! `https://github.com/owner/name.git`). [`RepoId`] normalizes them into the
//! canonical form used as the store's uniqueness key.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use url::Url;

use crate::error::{Error, Result};
use crate::manifest::Dependency;

/// Host assumed when an identifier carries none.
pub const DEFAULT_HOST: &str = "github.com";

/// A normalized repository identifier.
///
/// References without a host are taken to live on [`DEFAULT_HOST`], so every
/// spelling of one repository shares a single canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub host: String,
    pub owner: String,
    pub name: String,
}

impl RepoId {
    /// Parse any supported repository reference.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let path = if trimmed.contains("://") {
            let url = Url::parse(trimmed)?;
            let host = url.host_str().ok_or_else(|| Error::Identifier {
                input: input.to_string(),
                message: "URL has no host".to_string(),
            })?;
            format!("{}{}", host, url.path())
        } else {
            trimmed.to_string()
        };

        let path = path.trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [owner, name] => Ok(Self {
                host: DEFAULT_HOST.to_string(),
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            [host, owner, name] => Ok(Self {
                host: host.to_ascii_lowercase(),
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(Error::Identifier {
                input: input.to_string(),
                message: "expected owner/name or host/owner/name".to_string(),
            }),
        }
    }

    /// The store key: host-qualified path, no scheme, no `.git`.
    pub fn canonical_url(&self) -> String {
        format!("{}/{}/{}", self.host, self.owner, self.name)
    }

    /// The URL handed to `git clone`.
    pub fn clone_url(&self) -> String {
        format!(
            "https://{}/{}/{}.git",
            self.host,
            self.owner,
            self.name
        )
    }
}

impl FromStr for RepoId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_url())
    }
}

/// `path@version`, the argument form accepted by the module download tool.
pub fn download_spec(dependency: &Dependency) -> String {
    format!("{}@{}", dependency.path, dependency.version)
}

/// Escape a module path the way the Go module cache stores it on disk.
///
/// Upper-case letters become `!` followed by the lower-case letter, so that
/// module caches stay unambiguous on case-insensitive filesystems.
pub fn escape_module_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for ch in path.chars() {
        if ch.is_ascii_uppercase() {
            escaped.push('!');
            escaped.push(ch.to_ascii_lowercase());
        } else {
            escaped.push(ch);
        }
    }
    escaped
}

/// Directory a downloaded module lands in under `mod_cache`.
pub fn module_cache_dir(mod_cache: &Path, dependency: &Dependency) -> PathBuf {
    mod_cache.join(format!(
        "{}@{}",
        escape_module_path(&dependency.path),
        escape_module_path(&dependency.version)
    ))
}
