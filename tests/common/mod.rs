//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_store(stores::TWO_ROWS);
//!     fixture.command().arg("ls").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::stores;
    pub use super::TestFixture;
}

/// Store documents for seeding the JSON store.
#[allow(dead_code)]
pub mod stores {
    /// One complete row and one that was never enriched.
    pub const TWO_ROWS: &str = r#"{
  "next_id": 2,
  "rows": [
    {
      "id": 1,
      "name": "alpha",
      "url": "github.com/org/alpha",
      "open_issues": {"status": "done", "value": 4},
      "closed_issues": {"status": "done", "value": 9},
      "commit_count": {"status": "done", "value": 120},
      "own_code_lines": {"status": "done", "value": 3400},
      "library_code_lines": {"status": "done", "value": 56000},
      "stargazers": {"status": "done", "value": 77},
      "license": {"status": "done", "value": "mit"},
      "kind": {"status": "done", "value": "primary"}
    },
    {
      "id": 2,
      "name": "beta",
      "url": "github.com/org/beta"
    }
  ]
}"#;

    /// Three rows, two of which share a canonical URL.
    pub const DUPLICATES: &str = r#"{
  "next_id": 3,
  "rows": [
    {"id": 1, "name": "alpha", "url": "github.com/org/alpha"},
    {"id": 2, "name": "beta", "url": "github.com/org/beta"},
    {"id": 3, "name": "alpha", "url": "github.com/org/alpha"}
  ]
}"#;
}

/// A temporary directory holding a store file and a scratch tree.
///
/// Commands built from the fixture point `DEPSIZE_STORE` and
/// `DEPSIZE_SCRATCH` into the directory and clear service credentials, so
/// tests never read the user's environment.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Seed the store file with `content`.
    pub fn with_store(self, content: &str) -> Self {
        self.temp_dir
            .child("repositories.json")
            .write_str(content)
            .expect("Failed to write store file");
        self
    }

    /// Get the path to the temporary directory.
    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the store file.
    pub fn store_path(&self) -> PathBuf {
        self.temp_dir.path().join("repositories.json")
    }

    /// Get the path to the scratch directory.
    pub fn scratch_path(&self) -> PathBuf {
        self.temp_dir.path().join("scratch")
    }

    /// Create a command configured against this fixture.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("depsize");
        cmd.current_dir(self.path())
            .env("DEPSIZE_STORE", self.store_path())
            .env("DEPSIZE_SCRATCH", self.scratch_path())
            .env_remove("GITHUB_TOKEN")
            .env_remove("SOURCEGRAPH_TOKEN")
            .env_remove("DEPSIZE_FAILURE_POLICY")
            .env_remove("RUST_LOG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_store() {
        let fixture = TestFixture::new().with_store(stores::TWO_ROWS);
        assert!(fixture.store_path().exists());
    }

    #[test]
    fn test_store_constants_are_valid_json() {
        for store in [stores::TWO_ROWS, stores::DUPLICATES] {
            serde_json::from_str::<serde_json::Value>(store).expect("invalid store JSON");
        }
    }
}
