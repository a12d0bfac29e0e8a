//! Line counting through an external tool.
//!
//! The counter runs a `cloc`-compatible program with JSON output against a
//! directory and reads the total code line count from the report. Both the
//! `cloc` layout (`{"SUM": {"code": N}}`) and the `gocloc` layout
//! (`{"total": {"code": N}}`) are understood.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::process;

/// Trait for line counting - allows mocking in tests
pub trait LineCounter: Send + Sync {
    /// Count lines of code below `dir`.
    fn count_lines(&self, dir: &Path) -> Result<u64>;
}

/// Runs `<program> --json --quiet <dir>` and parses the report.
#[derive(Debug, Clone)]
pub struct ClocCounter {
    program: String,
    timeout: Duration,
}

impl ClocCounter {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl Default for ClocCounter {
    fn default() -> Self {
        Self::new("cloc", process::DEFAULT_TIMEOUT)
    }
}

impl LineCounter for ClocCounter {
    fn count_lines(&self, dir: &Path) -> Result<u64> {
        if !dir.is_dir() {
            return Err(Error::LineCount {
                path: dir.display().to_string(),
                message: "directory does not exist".to_string(),
            });
        }

        let mut command = Command::new(&self.program);
        command.args(["--json", "--quiet"]).arg(dir);
        let output = process::run_checked(&mut command, self.timeout)?;

        parse_report(&String::from_utf8_lossy(&output.stdout)).map_err(|message| {
            Error::LineCount {
                path: dir.display().to_string(),
                message,
            }
        })
    }
}

/// Extract the total code line count from a JSON report.
///
/// An empty report means the tool found no recognizable source files.
pub fn parse_report(report: &str) -> std::result::Result<u64, String> {
    let report = report.trim();
    if report.is_empty() {
        return Ok(0);
    }

    let value: Value = serde_json::from_str(report).map_err(|e| e.to_string())?;
    ["SUM", "total"]
        .iter()
        .find_map(|key| value.get(key).and_then(|total| total.get("code")))
        .map(|code| {
            code.as_u64()
                .ok_or_else(|| format!("code count is not a number: {}", code))
        })
        .unwrap_or_else(|| Err("report has no SUM or total section".to_string()))
}
