//! Orchestrator for a complete harvesting run
//!
//! [`Pipeline`] owns the run-scoped state, the worker pool and the scratch
//! tree, and lends them to each stage in turn:
//!
//! 1. Discover new repositories
//! 2. Enrich them (plus any stored rows still pending, when resuming)
//! 3. Measure own code and read manifests
//! 4. Resolve and total dependency sizes

use std::collections::HashSet;
use std::sync::Arc;

use log::info;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::{discovery, enrichment, measurement, resolution, Collaborators, Context};
use crate::config::{PipelineOptions, Settings};
use crate::error::Result;
use crate::fetch::GoModuleFetcher;
use crate::git::GitCli;
use crate::graphql::{GitHubClient, SourcegraphClient};
use crate::loc::ClocCounter;
use crate::model::Repository;
use crate::state::RunState;
use crate::store::{FileStore, RepositoryStore};
use crate::workspace::ScratchDir;

/// A configured run.
pub struct Pipeline {
    collaborators: Collaborators,
    options: PipelineOptions,
    state: RunState,
    pool: ThreadPool,
    scratch: ScratchDir,
}

impl Pipeline {
    pub fn new(collaborators: Collaborators, options: PipelineOptions) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(options.workers)
            .thread_name(|i| format!("depsize-worker-{}", i))
            .build()?;
        let scratch = ScratchDir::new(&options.scratch_root);
        Ok(Self {
            collaborators,
            options,
            state: RunState::new(),
            pool,
            scratch,
        })
    }

    /// Wire the real service clients, external tools and the file store.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let scratch = ScratchDir::new(&settings.pipeline.scratch_root);
        let collaborators = Collaborators {
            store: Arc::new(FileStore::open(&settings.store_path)?),
            search: Box::new(SourcegraphClient::new(
                settings.sourcegraph.endpoint.clone(),
                settings.sourcegraph.token.clone(),
            )?),
            metadata: Box::new(GitHubClient::new(
                settings.github.endpoint.clone(),
                settings.github.token.clone(),
                &settings.github.username,
            )?),
            source_control: Box::new(GitCli::new(settings.command_timeout)),
            line_counter: Box::new(ClocCounter::new(
                settings.line_counter.clone(),
                settings.command_timeout,
            )),
            fetcher: Box::new(GoModuleFetcher::new(scratch, settings.command_timeout)),
        };
        Self::new(collaborators, settings.pipeline.clone())
    }

    fn context(&self) -> Context<'_> {
        Context {
            collaborators: &self.collaborators,
            options: &self.options,
            state: &self.state,
            pool: &self.pool,
            scratch: &self.scratch,
        }
    }

    /// Run all four stages, discovering up to `count` repositories.
    ///
    /// Returns the repositories that went through the run in their final
    /// stored form.
    pub fn run(&self, count: usize) -> Result<Vec<Repository>> {
        let ctx = self.context();
        self.scratch.ensure()?;
        info!(
            "Starting run: count={}, workers={}, policy={}",
            count, self.options.workers, self.options.failure_policy
        );

        let discovered = discovery::execute(&ctx, count)?;
        let batch = self.with_pending(discovered)?;
        let enriched = enrichment::execute(&ctx, batch)?;
        let measured = measurement::execute(&ctx, enriched)?;
        let resolved = resolution::execute(&ctx, measured)?;

        info!(
            "Run finished: {} repositories, {} still incomplete",
            resolved.len(),
            resolved.iter().filter(|r| r.is_incomplete()).count()
        );
        Ok(resolved)
    }

    /// Append stored rows that still have pending work, without duplicates.
    fn with_pending(&self, mut batch: Vec<Repository>) -> Result<Vec<Repository>> {
        if !self.options.resume_pending {
            return Ok(batch);
        }
        let mut urls: HashSet<String> = batch.iter().map(|r| r.url.clone()).collect();
        let resumed: Vec<Repository> = self
            .store()
            .pending()?
            .into_iter()
            .filter(|r| urls.insert(r.url.clone()))
            .collect();
        if !resumed.is_empty() {
            info!("Resuming {} stored repositories with pending work", resumed.len());
        }
        batch.extend(resumed);
        Ok(batch)
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn store(&self) -> &dyn RepositoryStore {
        self.collaborators.store.as_ref()
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }
}
