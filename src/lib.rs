//! # depsize
//!
//! Harvests open-source repositories of a language ecosystem and estimates
//! two size metrics for each: the lines of its own code and the aggregate
//! lines of the third-party modules it depends on. Repeated dependencies are
//! measured once per run, and every run resumes where the previous one
//! stopped.
//!
//! ## Quick Example
//!
//! ```
//! use depsize::manifest;
//!
//! let go_mod = r#"
//! module github.com/example/app
//!
//! go 1.21
//!
//! require (
//!     example.com/x v1.0.0
//!     example.com/y v0.2.1 // indirect
//! )
//! "#;
//! let parsed = manifest::parse(go_mod).unwrap();
//! assert_eq!(parsed.module, "github.com/example/app");
//! assert_eq!(parsed.require.len(), 2);
//! assert!(parsed.require[1].indirect);
//! ```
//!
//! ## Core Concepts
//!
//! - **Records (`model`, `store`)**: one row per repository, each metric
//!   carrying an explicit pending/done marker, kept in a [`store::RepositoryStore`].
//! - **Parsers (`manifest`, `identifier`)**: `go.mod` parsing with replace
//!   resolution, and normalization of repository references.
//! - **Collaborators (`graphql`, `git`, `loc`, `fetch`)**: the search and
//!   metadata services and the external clone, line-count and module download
//!   tools, each behind a trait.
//! - **Run state (`state`, `workspace`)**: the dependency map, manifest cache
//!   and library cache of one run, and the scratch tree on disk.
//! - **Phases (`phases`)**: the staged pipeline driven by
//!   [`phases::orchestrator::Pipeline`].
//!
//! ## Execution Flow
//!
//! 1.  **Discovery**: search for candidates, record the new ones.
//! 2.  **Enrichment**: fetch platform metadata.
//! 3.  **Measurement**: clone, count, read manifests.
//! 4.  **Resolution**: download, count and total dependencies.

pub mod config;
pub mod defaults;
pub mod error;
pub mod fetch;
pub mod git;
pub mod graphql;
pub mod identifier;
pub mod loc;
pub mod manifest;
pub mod model;
pub mod phases;
pub mod process;
pub mod state;
pub mod store;
pub mod workspace;

#[cfg(test)]
mod identifier_proptest;
