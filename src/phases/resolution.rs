//! Stage 4: Dependency Resolution
//!
//! Totals the code size of every repository's dependencies. Each distinct
//! module is downloaded and counted at most once per run; its count is kept
//! in the run's library cache and reused for every repository requiring it.
//!
//! The module download tool runs inside the scratch fetch directory, whose
//! manifest pair is swapped for a throwaway one for the duration of the
//! stage and restored afterwards, including on error.
//!
//! Resolution is serial by default and purges the module cache after each
//! repository. With parallel resolution enabled it runs on the worker pool,
//! relying on the cache's per-module locking, and purges once at the end.

use log::{debug, info, warn};
use rayon::prelude::*;

use super::Context;
use crate::error::Result;
use crate::manifest::Dependency;
use crate::model::{Metric, Repository, Stage};
use crate::workspace::ManifestSwap;

/// Module name written into the scratch manifest.
const SCRATCH_MODULE: &str = "depsize.invalid/scratch";

/// Executes the dependency resolution stage.
///
/// Returns every input repository in its latest stored form. Repositories
/// whose manifest was not read during this run keep a pending library size.
pub fn execute(ctx: &Context<'_>, repositories: Vec<Repository>) -> Result<Vec<Repository>> {
    ctx.scratch.ensure()?;
    let _swap = ManifestSwap::install(&ctx.scratch.fetch_dir(), SCRATCH_MODULE)?;

    let resolved: Vec<Repository> = if ctx.options.parallel_resolution {
        let outcome = ctx.pool.install(|| {
            repositories
                .par_iter()
                .map(|repository| resolve_one(ctx, repository))
                .collect::<Result<Vec<_>>>()
        });
        ctx.scratch.purge_mod_cache()?;
        outcome?.into_iter().flatten().collect()
    } else {
        let mut resolved = Vec::with_capacity(repositories.len());
        for repository in &repositories {
            let outcome = resolve_one(ctx, repository);
            ctx.scratch.purge_mod_cache()?;
            resolved.extend(outcome?);
        }
        resolved
    };

    info!(
        "Resolution finished: {} of {} repositories totalled, {} modules measured",
        resolved.iter().filter(|r| !r.needs(Stage::Resolution)).count(),
        resolved.len(),
        ctx.state.libraries.len()?
    );
    Ok(resolved)
}

fn resolve_one(ctx: &Context<'_>, repository: &Repository) -> Result<Option<Repository>> {
    let Some(mut current) = ctx.reload(repository)? else {
        return Ok(None);
    };
    if !current.needs(Stage::Resolution) {
        debug!("{} already resolved", current.url);
        return Ok(Some(current));
    }

    let Some(dependencies) = ctx.state.dependencies.get(&current.url)? else {
        warn!(
            "No dependency list for {}, leaving its library size pending",
            current.url
        );
        return Ok(Some(current));
    };

    let mut total = 0u64;
    for dependency in &dependencies {
        total += ctx
            .state
            .libraries
            .get_or_measure(&dependency.path, || measure(ctx, dependency))?;
    }
    debug!(
        "{}: {} lines across {} modules",
        current.url,
        total,
        dependencies.len()
    );

    current.library_code_lines = Metric::Done(total);
    ctx.store().update(&current)?;
    Ok(Some(current))
}

/// Download and count one module. Failures count as zero.
fn measure(ctx: &Context<'_>, dependency: &Dependency) -> u64 {
    let counted = ctx
        .collaborators
        .fetcher
        .fetch(dependency)
        .and_then(|dir| ctx.collaborators.line_counter.count_lines(&dir));
    match counted {
        Ok(lines) => lines,
        Err(e) => {
            warn!(
                "Counting {}@{} as 0 lines: {}",
                dependency.path, dependency.version, e
            );
            0
        }
    }
}
