//! # Repository Store
//!
//! The persisted table of [`Repository`] rows, keyed for lookups by canonical
//! URL. Stages only talk to the [`RepositoryStore`] trait; two
//! implementations are provided:
//!
//! - **`MemoryStore`**: process-local, used by tests and dry runs.
//! - **`FileStore`**: a JSON document on disk, rewritten atomically
//!   (temp file + rename) after every mutation.
//!
//! Both serialize access through a mutex, which also makes
//! [`RepositoryStore::insert_if_absent`] an atomic check-and-insert: two
//! discovery workers racing on the same URL can never both create a row.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::Repository;

/// Trait for the persisted store - allows swapping backends and mocking in tests
pub trait RepositoryStore: Send + Sync {
    /// The first row whose canonical URL is `url`.
    fn find_by_url(&self, url: &str) -> Result<Option<Repository>>;

    /// Create `repository` unless a row with its URL exists. Returns the
    /// created row (with its assigned id), or `None` if it was already known.
    fn insert_if_absent(&self, repository: Repository) -> Result<Option<Repository>>;

    /// Overwrite the row with `repository.id`.
    fn update(&self, repository: &Repository) -> Result<()>;

    /// All rows in id order.
    fn all(&self) -> Result<Vec<Repository>>;

    /// Delete the row with `id`. Returns whether a row was removed.
    fn delete(&self, id: u64) -> Result<bool>;

    /// Rows on which at least one stage still has work to do.
    fn pending(&self) -> Result<Vec<Repository>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(Repository::is_incomplete)
            .collect())
    }
}

/// Row storage shared by both backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Table {
    next_id: u64,
    rows: Vec<Repository>,
}

impl Table {
    fn find_by_url(&self, url: &str) -> Option<&Repository> {
        self.rows.iter().find(|row| row.url == url)
    }

    fn insert_if_absent(&mut self, mut repository: Repository) -> Option<Repository> {
        if self.find_by_url(&repository.url).is_some() {
            return None;
        }
        self.next_id = self.next_id.max(self.rows.iter().map(|r| r.id).max().unwrap_or(0)) + 1;
        repository.id = self.next_id;
        self.rows.push(repository.clone());
        Some(repository)
    }

    fn update(&mut self, repository: &Repository) -> Result<()> {
        let row = self
            .rows
            .iter_mut()
            .find(|row| row.id == repository.id)
            .ok_or_else(|| Error::Store {
                message: format!("no row with id {} ({})", repository.id, repository.url),
            })?;
        *row = repository.clone();
        Ok(())
    }

    fn delete(&mut self, id: u64) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.id != id);
        self.rows.len() != before
    }

    fn all(&self) -> Vec<Repository> {
        let mut rows = self.rows.clone();
        rows.sort_by_key(|row| row.id);
        rows
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing rows, keeping their ids. Duplicate URLs are kept,
    /// which is useful for exercising [`prune_duplicates`].
    pub fn with_rows(rows: Vec<Repository>) -> Self {
        let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0);
        Self {
            table: Mutex::new(Table { next_id, rows }),
        }
    }

    fn table(&self) -> Result<MutexGuard<'_, Table>> {
        self.table.lock().map_err(|_| Error::poisoned("memory store"))
    }
}

impl RepositoryStore for MemoryStore {
    fn find_by_url(&self, url: &str) -> Result<Option<Repository>> {
        Ok(self.table()?.find_by_url(url).cloned())
    }

    fn insert_if_absent(&self, repository: Repository) -> Result<Option<Repository>> {
        Ok(self.table()?.insert_if_absent(repository))
    }

    fn update(&self, repository: &Repository) -> Result<()> {
        self.table()?.update(repository)
    }

    fn all(&self) -> Result<Vec<Repository>> {
        Ok(self.table()?.all())
    }

    fn delete(&self, id: u64) -> Result<bool> {
        Ok(self.table()?.delete(id))
    }
}

/// JSON file store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    table: Mutex<Table>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| Error::Store {
                message: format!("{} is not a valid store: {}", path.display(), e),
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Table::default(),
            Err(e) => {
                return Err(Error::Store {
                    message: format!("cannot read {}: {}", path.display(), e),
                })
            }
        };
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn table(&self) -> Result<MutexGuard<'_, Table>> {
        self.table.lock().map_err(|_| Error::poisoned("file store"))
    }

    /// Apply `change` to a copy of the table and swap the copy in only once it
    /// is on disk. `change` reports its result and whether it changed anything.
    fn commit<T>(&self, change: impl FnOnce(&mut Table) -> Result<(T, bool)>) -> Result<T> {
        let mut table = self.table()?;
        let mut staged = table.clone();
        let (outcome, changed) = change(&mut staged)?;
        if changed {
            self.persist(&staged)?;
            *table = staged;
        }
        Ok(outcome)
    }

    /// Write the table; the caller holds the lock so writes never interleave.
    fn persist(&self, table: &Table) -> Result<()> {
        let write = || -> io::Result<()> {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let staging = self.path.with_extension("json.tmp");
            let content = serde_json::to_vec_pretty(table)?;
            fs::write(&staging, content)?;
            fs::rename(&staging, &self.path)
        };
        write().map_err(|e| Error::Store {
            message: format!("cannot write {}: {}", self.path.display(), e),
        })
    }
}

impl RepositoryStore for FileStore {
    fn find_by_url(&self, url: &str) -> Result<Option<Repository>> {
        Ok(self.table()?.find_by_url(url).cloned())
    }

    fn insert_if_absent(&self, repository: Repository) -> Result<Option<Repository>> {
        self.commit(|table| {
            let created = table.insert_if_absent(repository);
            let changed = created.is_some();
            Ok((created, changed))
        })
    }

    fn update(&self, repository: &Repository) -> Result<()> {
        self.commit(|table| table.update(repository).map(|()| ((), true)))
    }

    fn all(&self) -> Result<Vec<Repository>> {
        Ok(self.table()?.all())
    }

    fn delete(&self, id: u64) -> Result<bool> {
        self.commit(|table| {
            let removed = table.delete(id);
            Ok((removed, removed))
        })
    }
}

/// Delete rows that share a canonical URL, keeping the lowest id of each.
/// Returns the number of rows removed.
pub fn prune_duplicates(store: &dyn RepositoryStore) -> Result<usize> {
    let mut seen = std::collections::HashSet::new();
    let mut removed = 0;
    for row in store.all()? {
        if !seen.insert(row.url.clone()) && store.delete(row.id)? {
            info!("Removed duplicate row {} for {}", row.id, row.url);
            removed += 1;
        }
    }
    Ok(removed)
}
