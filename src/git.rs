use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::process;

/// Trait for version-control operations - allows mocking in tests
pub trait SourceControl: Send + Sync {
    /// Shallow-clone `url` into `target_dir`.
    fn clone_shallow(&self, url: &str, target_dir: &Path) -> Result<()>;
}

/// The system `git` command.
///
/// Using the binary rather than a library picks up whatever credentials the
/// host has configured (SSH agent, credential helpers, tokens in
/// ~/.gitconfig).
#[derive(Debug, Clone)]
pub struct GitCli {
    timeout: Duration,
}

impl GitCli {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(process::DEFAULT_TIMEOUT)
    }
}

impl SourceControl for GitCli {
    fn clone_shallow(&self, url: &str, target_dir: &Path) -> Result<()> {
        // git won't clone into an existing non-empty dir
        if target_dir.exists() {
            fs::remove_dir_all(target_dir)?;
        }
        if let Some(parent) = target_dir.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut command = Command::new("git");
        command
            .args(["clone", "--depth", "1", url])
            .arg(target_dir)
            .env("GIT_TERMINAL_PROMPT", "0");

        let output = match process::run(&mut command, self.timeout) {
            Ok(output) => output,
            Err(Error::Io(e)) => {
                return Err(Error::GitClone {
                    url: url.to_string(),
                    message: e.to_string(),
                    hint: Some("Is git installed and on PATH?".to_string()),
                })
            }
            Err(e) => return Err(e),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::GitClone {
                url: url.to_string(),
                hint: clone_hint(&stderr),
                message: stderr,
            });
        }

        Ok(())
    }
}

fn clone_hint(stderr: &str) -> Option<String> {
    if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("could not read Username")
    {
        Some("The repository may be private or renamed; it will be retried next run".to_string())
    } else if stderr.contains("not found") {
        Some("The repository no longer exists upstream".to_string())
    } else {
        None
    }
}
