//! Run-scoped shared state.
//!
//! These maps live for one pipeline run, are owned by the driver and lent to
//! the stages by reference. None of them is persisted: the dependency map and
//! manifest cache are rebuilt from manifests on every run, and the library
//! cache only avoids measuring the same module twice within a run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::manifest::{dedup_by_path, Dependency, Manifest};

/// Repository URL -> deduplicated dependency list.
///
/// Measurement workers write concurrently; every mutation happens under the
/// single map lock so entries for different repositories never clobber each
/// other.
#[derive(Debug, Default)]
pub struct DependencyMap {
    entries: Mutex<HashMap<String, Vec<Dependency>>>,
}

impl DependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `dependencies` to the entry for `repository` and deduplicate.
    pub fn merge(&self, repository: &str, dependencies: Vec<Dependency>) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::poisoned("dependency map"))?;
        let entry = entries.entry(repository.to_string()).or_default();
        entry.extend(dependencies);
        *entry = dedup_by_path(std::mem::take(entry));
        Ok(())
    }

    /// The dependency list recorded for `repository`, if its manifest was read.
    pub fn get(&self, repository: &str) -> Result<Option<Vec<Dependency>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::poisoned("dependency map"))?;
        Ok(entries.get(repository).cloned())
    }

    pub fn len(&self) -> Result<usize> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::poisoned("dependency map"))?;
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Repository URL -> parsed manifest.
#[derive(Debug, Default)]
pub struct ManifestCache {
    manifests: Mutex<HashMap<String, Manifest>>,
}

impl ManifestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, repository: &str, manifest: Manifest) -> Result<()> {
        let mut manifests = self
            .manifests
            .lock()
            .map_err(|_| Error::poisoned("manifest cache"))?;
        manifests.insert(repository.to_string(), manifest);
        Ok(())
    }

    pub fn get(&self, repository: &str) -> Result<Option<Manifest>> {
        let manifests = self
            .manifests
            .lock()
            .map_err(|_| Error::poisoned("manifest cache"))?;
        Ok(manifests.get(repository).cloned())
    }
}

type Slot = Arc<Mutex<Option<u64>>>;

/// Module path -> measured line count.
///
/// Each key has its own slot lock, so concurrent resolvers asking for the
/// same module wait for the first measurement instead of downloading it
/// again, while different modules proceed in parallel.
#[derive(Debug, Default)]
pub struct LibraryCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl LibraryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Result<Slot> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| Error::poisoned("library cache"))?;
        Ok(Arc::clone(slots.entry(key.to_string()).or_default()))
    }

    /// Cached count for `key`, without measuring.
    pub fn get(&self, key: &str) -> Result<Option<u64>> {
        let slot = {
            let slots = self
                .slots
                .lock()
                .map_err(|_| Error::poisoned("library cache"))?;
            match slots.get(key) {
                Some(slot) => Arc::clone(slot),
                None => return Ok(None),
            }
        };
        let value = slot.lock().map_err(|_| Error::poisoned("library slot"))?;
        Ok(*value)
    }

    /// Return the cached count for `key`, running `measure` exactly once per
    /// key for the lifetime of the cache.
    pub fn get_or_measure<F>(&self, key: &str, measure: F) -> Result<u64>
    where
        F: FnOnce() -> u64,
    {
        let slot = self.slot(key)?;
        let mut value = slot.lock().map_err(|_| Error::poisoned("library slot"))?;
        if let Some(lines) = *value {
            return Ok(lines);
        }
        let lines = measure();
        *value = Some(lines);
        Ok(lines)
    }

    /// Number of measured modules.
    pub fn len(&self) -> Result<usize> {
        let slots: Vec<Slot> = {
            let slots = self
                .slots
                .lock()
                .map_err(|_| Error::poisoned("library cache"))?;
            slots.values().cloned().collect()
        };
        let mut measured = 0;
        for slot in slots {
            if slot
                .lock()
                .map_err(|_| Error::poisoned("library slot"))?
                .is_some()
            {
                measured += 1;
            }
        }
        Ok(measured)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// All run-scoped state, owned by the pipeline driver.
#[derive(Debug, Default)]
pub struct RunState {
    pub dependencies: DependencyMap,
    pub manifests: ManifestCache,
    pub libraries: LibraryCache,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }
}
