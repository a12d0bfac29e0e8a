//! Default values for depsize configuration.
//!
//! This module provides centralized default values used across the library
//! and the CLI, ensuring consistency and avoiding duplication.

use std::path::PathBuf;

pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_GITHUB_USERNAME: &str = "GITHUB_USERNAME";
pub const ENV_GITHUB_API: &str = "GITHUB_GRAPHQL_API";
pub const ENV_SOURCEGRAPH_API: &str = "SOURCEGRAPH_GRAPHQL_API";
pub const ENV_SOURCEGRAPH_TOKEN: &str = "SOURCEGRAPH_TOKEN";
pub const ENV_WORKERS: &str = "DEPSIZE_WORKERS";
pub const ENV_SCRATCH: &str = "DEPSIZE_SCRATCH";
pub const ENV_STORE: &str = "DEPSIZE_STORE";
pub const ENV_COMMAND_TIMEOUT: &str = "DEPSIZE_COMMAND_TIMEOUT";
pub const ENV_FAILURE_POLICY: &str = "DEPSIZE_FAILURE_POLICY";
pub const ENV_LINE_COUNTER: &str = "DEPSIZE_LINE_COUNTER";

pub const GITHUB_GRAPHQL_API: &str = "https://api.github.com/graphql";
pub const SOURCEGRAPH_GRAPHQL_API: &str = "https://sourcegraph.com/.api/graphql";

/// Line-counting program; must accept `--json --quiet <dir>`.
pub const LINE_COUNTER: &str = "cloc";

/// Returns the default scratch root.
///
/// Uses the platform cache directory (`~/.cache/depsize/scratch` on Linux),
/// falling back to `.depsize-scratch` in the current directory.
pub fn default_scratch_root() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("depsize").join("scratch"))
        .unwrap_or_else(|| PathBuf::from(".depsize-scratch"))
}

/// Returns the default store file.
///
/// Uses the platform data directory (`~/.local/share/depsize` on Linux),
/// falling back to the current directory.
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("depsize"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("repositories.json")
}

/// Worker pool width when none is configured: the available parallelism.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
