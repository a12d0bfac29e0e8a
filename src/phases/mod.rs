//! Implementation of the four stages of a harvesting run.
//!
//! ## Overview
//!
//! A run follows four stages, composed in sequence by the orchestrator:
//! 1. Discovery - Search for candidate repositories and record the new ones
//! 2. Enrichment - Fetch platform metadata for repositories not yet enriched
//! 3. Measurement - Clone, count own code, and read each repository's manifest
//! 4. Resolution - Download, count and memoize dependencies, then total them per repository
//!
//! Discovery, enrichment and measurement fan their items out over a bounded
//! worker pool and join before returning. Resolution runs serially unless
//! parallel resolution is enabled.
//!
//! Progress lives in the store: every stage re-reads a row and skips it when
//! its marker field is already done, so an interrupted run can simply be
//! started again.

use std::sync::Arc;

use log::warn;
use rayon::ThreadPool;

use crate::config::{FailurePolicy, PipelineOptions};
use crate::error::Result;
use crate::fetch::ModuleFetcher;
use crate::git::SourceControl;
use crate::graphql::{MetadataApi, SearchApi};
use crate::loc::LineCounter;
use crate::model::Repository;
use crate::state::RunState;
use crate::store::RepositoryStore;
use crate::workspace::ScratchDir;

// Stage modules
pub mod discovery;
pub mod enrichment;
pub mod measurement;
pub mod orchestrator;
pub mod resolution;

/// The external systems a run talks to.
pub struct Collaborators {
    pub store: Arc<dyn RepositoryStore>,
    pub search: Box<dyn SearchApi>,
    pub metadata: Box<dyn MetadataApi>,
    pub source_control: Box<dyn SourceControl>,
    pub line_counter: Box<dyn LineCounter>,
    pub fetcher: Box<dyn ModuleFetcher>,
}

/// Everything a stage needs, borrowed from the orchestrator.
pub struct Context<'a> {
    pub collaborators: &'a Collaborators,
    pub options: &'a PipelineOptions,
    pub state: &'a RunState,
    pub pool: &'a ThreadPool,
    pub scratch: &'a ScratchDir,
}

impl Context<'_> {
    pub fn store(&self) -> &dyn RepositoryStore {
        self.collaborators.store.as_ref()
    }

    /// Re-read `repository` from the store; `None` if the row is gone.
    fn reload(&self, repository: &Repository) -> Result<Option<Repository>> {
        let current = self.store().find_by_url(&repository.url)?;
        if current.is_none() {
            warn!("{} is no longer in the store, skipping", repository.url);
        }
        Ok(current)
    }
}

/// Apply the failure policy to one item's outcome.
///
/// Per-item failures are logged and turned into `None` under
/// [`FailurePolicy::Skip`]; fatal errors always propagate.
pub(crate) fn settle<T>(policy: FailurePolicy, item: &str, outcome: Result<T>) -> Result<Option<T>> {
    match outcome {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_item_failure() && policy == FailurePolicy::Skip => {
            warn!("Skipping {}: {}", item, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Mock collaborators shared by the stage tests.

    use std::collections::HashMap;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use rayon::ThreadPoolBuilder;
    use tempfile::TempDir;

    use super::*;
    use crate::error::Error;
    use crate::graphql::{RepositoryMetadata, SearchQuery};
    use crate::identifier::RepoId;
    use crate::manifest::{Dependency, MANIFEST_FILE};
    use crate::store::MemoryStore;

    pub struct MockSearch {
        pub names: Vec<String>,
        pub queries: Arc<Mutex<Vec<SearchQuery>>>,
    }

    impl SearchApi for MockSearch {
        fn search_repositories(&self, query: &SearchQuery) -> Result<Vec<String>> {
            self.queries.lock().unwrap().push(query.clone());
            Ok(self.names.iter().take(query.count).cloned().collect())
        }
    }

    #[derive(Default)]
    pub struct MockMetadata {
        pub responses: HashMap<String, RepositoryMetadata>,
        pub calls: Arc<Mutex<Vec<String>>>,
    }

    impl MetadataApi for MockMetadata {
        fn repository_metadata(&self, id: &RepoId) -> Result<RepositoryMetadata> {
            let key = format!("{}/{}", id.owner, id.name);
            self.calls.lock().unwrap().push(key.clone());
            self.responses.get(&key).cloned().ok_or_else(|| Error::Api {
                service: "GitHub".to_string(),
                message: format!("no canned response for {}", key),
            })
        }
    }

    /// Writes canned manifests and source files into the clone target.
    #[derive(Default)]
    pub struct MockSourceControl {
        /// clone URL -> go.mod content
        pub manifests: HashMap<String, String>,
        pub clones: Arc<Mutex<Vec<String>>>,
    }

    impl SourceControl for MockSourceControl {
        fn clone_shallow(&self, url: &str, target_dir: &Path) -> Result<()> {
            self.clones.lock().unwrap().push(url.to_string());
            let manifest = self.manifests.get(url).ok_or_else(|| Error::GitClone {
                url: url.to_string(),
                message: "repository not found".to_string(),
                hint: None,
            })?;
            fs::create_dir_all(target_dir)?;
            fs::write(target_dir.join(MANIFEST_FILE), manifest)?;
            fs::write(target_dir.join("main.go"), "package main\n")?;
            Ok(())
        }
    }

    /// Counts every directory as `lines`, except those registered in `sizes`.
    #[derive(Default)]
    pub struct MockLineCounter {
        pub lines: u64,
        pub sizes: HashMap<PathBuf, u64>,
        pub calls: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl LineCounter for MockLineCounter {
        fn count_lines(&self, dir: &Path) -> Result<u64> {
            self.calls.lock().unwrap().push(dir.to_path_buf());
            Ok(self.sizes.get(dir).copied().unwrap_or(self.lines))
        }
    }

    /// Pretends to download modules to `<root>/<path>@<version>`.
    pub struct MockFetcher {
        pub root: PathBuf,
        pub failing: Vec<String>,
        pub calls: Arc<Mutex<Vec<String>>>,
    }

    impl ModuleFetcher for MockFetcher {
        fn fetch(&self, dependency: &Dependency) -> Result<PathBuf> {
            self.calls.lock().unwrap().push(dependency.path.clone());
            if self.failing.contains(&dependency.path) {
                return Err(Error::Command {
                    program: "go".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "not found".to_string(),
                });
            }
            Ok(self
                .root
                .join(format!("{}@{}", dependency.path, dependency.version)))
        }
    }

    /// Owns the mocks, a memory store, a scratch dir and a pool.
    pub struct Harness {
        pub collaborators: Collaborators,
        pub options: PipelineOptions,
        pub state: RunState,
        pub pool: ThreadPool,
        pub scratch: ScratchDir,
        pub store: Arc<MemoryStore>,
        pub clones: Arc<Mutex<Vec<String>>>,
        pub fetches: Arc<Mutex<Vec<String>>>,
        pub metadata_calls: Arc<Mutex<Vec<String>>>,
        _temp: TempDir,
    }

    pub struct HarnessBuilder {
        pub search: Vec<String>,
        pub metadata: HashMap<String, RepositoryMetadata>,
        pub manifests: HashMap<String, String>,
        pub lines: u64,
        pub failing_fetches: Vec<String>,
        pub store: MemoryStore,
        pub options: PipelineOptions,
    }

    impl Default for HarnessBuilder {
        fn default() -> Self {
            let options = PipelineOptions {
                workers: 4,
                ..PipelineOptions::default()
            };
            Self {
                search: Vec::new(),
                metadata: HashMap::new(),
                manifests: HashMap::new(),
                lines: 100,
                failing_fetches: Vec::new(),
                store: MemoryStore::new(),
                options,
            }
        }
    }

    impl HarnessBuilder {
        pub fn build(self) -> Harness {
            let temp = TempDir::new().unwrap();
            let scratch = ScratchDir::new(temp.path().join("scratch"));
            let mut options = self.options;
            options.scratch_root = scratch.root().to_path_buf();

            let store = Arc::new(self.store);
            let clones = Arc::new(Mutex::new(Vec::new()));
            let fetches = Arc::new(Mutex::new(Vec::new()));
            let metadata_calls = Arc::new(Mutex::new(Vec::new()));

            let collaborators = Collaborators {
                store: store.clone(),
                search: Box::new(MockSearch {
                    names: self.search,
                    queries: Arc::new(Mutex::new(Vec::new())),
                }),
                metadata: Box::new(MockMetadata {
                    responses: self.metadata,
                    calls: metadata_calls.clone(),
                }),
                source_control: Box::new(MockSourceControl {
                    manifests: self.manifests,
                    clones: clones.clone(),
                }),
                line_counter: Box::new(MockLineCounter {
                    lines: self.lines,
                    ..MockLineCounter::default()
                }),
                fetcher: Box::new(MockFetcher {
                    root: temp.path().join("modules"),
                    failing: self.failing_fetches,
                    calls: fetches.clone(),
                }),
            };

            Harness {
                collaborators,
                pool: ThreadPoolBuilder::new()
                    .num_threads(options.workers)
                    .build()
                    .unwrap(),
                options,
                state: RunState::new(),
                scratch,
                store,
                clones,
                fetches,
                metadata_calls,
                _temp: temp,
            }
        }
    }

    impl Harness {
        pub fn context(&self) -> Context<'_> {
            Context {
                collaborators: &self.collaborators,
                options: &self.options,
                state: &self.state,
                pool: &self.pool,
                scratch: &self.scratch,
            }
        }

        /// Insert a bare row and return it with its id.
        pub fn seed(&self, url: &str) -> Repository {
            let id = RepoId::parse(url).unwrap();
            self.store
                .insert_if_absent(Repository::new(id.name.clone(), id.canonical_url()))
                .unwrap()
                .unwrap()
        }
    }

    /// Call logs and the temp dir, kept alive alongside a [`Pipeline`].
    ///
    /// [`Pipeline`]: super::orchestrator::Pipeline
    pub struct Probes {
        pub store: Arc<MemoryStore>,
        pub clones: Arc<Mutex<Vec<String>>>,
        pub fetches: Arc<Mutex<Vec<String>>>,
        pub metadata_calls: Arc<Mutex<Vec<String>>>,
        _temp: TempDir,
    }

    impl Harness {
        /// Hand the collaborators to a real pipeline.
        pub fn into_pipeline(self) -> (super::orchestrator::Pipeline, Probes) {
            let pipeline =
                super::orchestrator::Pipeline::new(self.collaborators, self.options).unwrap();
            let probes = Probes {
                store: self.store,
                clones: self.clones,
                fetches: self.fetches,
                metadata_calls: self.metadata_calls,
                _temp: self._temp,
            };
            (pipeline, probes)
        }
    }

    pub fn metadata(open: u64, closed: u64, commits: u64, license: &str) -> RepositoryMetadata {
        RepositoryMetadata {
            commit_count: commits,
            open_issues: open,
            closed_issues: closed,
            license: license.to_string(),
            ..RepositoryMetadata::default()
        }
    }
}
