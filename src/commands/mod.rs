//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `depsize` command-line tool, one file per subcommand.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `depsize` library.
//!
//! Every command that touches the store accepts the shared [`StoreArgs`].

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use depsize::defaults;
use depsize::identifier::RepoId;
use depsize::model::Repository;
use depsize::store::{FileStore, RepositoryStore};

pub mod fetch;
pub mod ls;
pub mod prune;
pub mod rm;
pub mod show;

/// Location of the repository store.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Path to the JSON repository store.
    ///
    /// Defaults to the platform data directory
    /// (`~/.local/share/depsize/repositories.json` on Linux).
    #[arg(long, value_name = "FILE", env = defaults::ENV_STORE)]
    pub store: Option<PathBuf>,
}

impl StoreArgs {
    pub fn path(&self) -> PathBuf {
        self.store
            .clone()
            .unwrap_or_else(defaults::default_store_path)
    }

    pub fn open(&self) -> Result<FileStore> {
        let path = self.path();
        FileStore::open(&path)
            .with_context(|| format!("Failed to open store at {}", path.display()))
    }
}

/// Look up a row by any spelling of its URL.
pub fn find(store: &dyn RepositoryStore, reference: &str) -> Result<Option<Repository>> {
    if let Some(row) = store.find_by_url(reference)? {
        return Ok(Some(row));
    }
    let canonical = RepoId::parse(reference)?.canonical_url();
    Ok(store.find_by_url(&canonical)?)
}

/// Print rows as an aligned table. Pending metrics show as `-`.
pub fn print_table(rows: &[Repository]) {
    let cell = |value: String| if value.is_empty() { "-".to_string() } else { value };
    let width = rows.iter().map(|r| r.url.len()).max().unwrap_or(3).max(3);

    println!(
        "{:>5}  {:<width$}  {:>10}  {:>12}  {:>8}  {:>6}  LICENSE",
        "ID",
        "URL",
        "OWN",
        "LIBRARIES",
        "COMMITS",
        "STARS",
        width = width
    );
    for row in rows {
        println!(
            "{:>5}  {:<width$}  {:>10}  {:>12}  {:>8}  {:>6}  {}",
            row.id,
            row.url,
            cell(row.own_code_lines.to_string()),
            cell(row.library_code_lines.to_string()),
            cell(row.commit_count.to_string()),
            cell(row.stargazers.to_string()),
            cell(row.license.to_string()),
            width = width
        );
    }
}
