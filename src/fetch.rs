//! Downloading dependency modules into the scratch module cache.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::identifier::{download_spec, module_cache_dir};
use crate::manifest::Dependency;
use crate::process;
use crate::workspace::ScratchDir;

/// Trait for module downloads - allows mocking in tests
pub trait ModuleFetcher: Send + Sync {
    /// Materialize `dependency` on disk and return the directory holding its
    /// source.
    fn fetch(&self, dependency: &Dependency) -> Result<PathBuf>;
}

/// Runs `go mod download -json <path>@<version>` against the scratch
/// `GOPATH`, so nothing touches the user's own module cache.
#[derive(Debug, Clone)]
pub struct GoModuleFetcher {
    scratch: ScratchDir,
    timeout: Duration,
}

impl GoModuleFetcher {
    pub fn new(scratch: ScratchDir, timeout: Duration) -> Self {
        Self { scratch, timeout }
    }
}

/// The fields of `go mod download -json` we care about.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DownloadReport {
    dir: Option<String>,
    error: Option<String>,
}

impl ModuleFetcher for GoModuleFetcher {
    fn fetch(&self, dependency: &Dependency) -> Result<PathBuf> {
        let spec = download_spec(dependency);
        let mut command = Command::new("go");
        command
            .args(["mod", "download", "-json"])
            .arg(&spec)
            .current_dir(self.scratch.fetch_dir())
            .env("GOPATH", self.scratch.gopath())
            .env("GOMODCACHE", self.scratch.mod_cache())
            .env("GOFLAGS", "-mod=mod")
            .env("GO111MODULE", "on");

        let output = process::run(&mut command, self.timeout)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let report: Option<DownloadReport> = serde_json::from_str(stdout.trim()).ok();

        if let Some(message) = report.as_ref().and_then(|r| r.error.clone()) {
            return Err(Error::Command {
                program: "go".to_string(),
                status: output.status.to_string(),
                stderr: message,
            });
        }
        if !output.status.success() {
            return Err(Error::Command {
                program: "go".to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(report
            .and_then(|r| r.dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| module_cache_dir(&self.scratch.mod_cache(), dependency)))
    }
}
