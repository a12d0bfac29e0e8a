//! Stage 3: Measurement
//!
//! For every repository whose own code size is pending: shallow-clone it
//! into the scratch tree, count its lines, read its manifest, and record the
//! flattened requirement list in the run's dependency map.
//!
//! A repository whose own size is already stored but whose library size is
//! still pending is cloned again only to rebuild its dependency list. Its own
//! code is not recounted.
//!
//! Repositories are processed in chunks as wide as the worker pool. Clones
//! are purged once a chunk's workers have all joined, never while one of
//! them may still be writing into the scratch tree.

use log::{debug, info, warn};
use rayon::prelude::*;

use super::{settle, Context};
use crate::error::Result;
use crate::identifier::RepoId;
use crate::manifest;
use crate::model::{Metric, Repository, Stage};

/// Executes the measurement stage.
///
/// Returns every input repository in its latest stored form.
pub fn execute(ctx: &Context<'_>, repositories: Vec<Repository>) -> Result<Vec<Repository>> {
    ctx.scratch.ensure()?;
    let chunk_size = ctx.options.workers.max(1);

    let mut measured = Vec::with_capacity(repositories.len());
    for chunk in repositories.chunks(chunk_size) {
        let outcome = ctx.pool.install(|| {
            chunk
                .par_iter()
                .map(|repository| measure_one(ctx, repository))
                .collect::<Result<Vec<_>>>()
        });
        ctx.scratch.purge_repositories()?;
        measured.extend(outcome?.into_iter().flatten());
    }

    info!(
        "Measurement finished: {} of {} repositories sized",
        measured.iter().filter(|r| !r.needs(Stage::Measurement)).count(),
        measured.len()
    );
    Ok(measured)
}

fn measure_one(ctx: &Context<'_>, repository: &Repository) -> Result<Option<Repository>> {
    let Some(mut current) = ctx.reload(repository)? else {
        return Ok(None);
    };
    let count_own = current.needs(Stage::Measurement);
    if !count_own && !needs_dependency_list(ctx, &current)? {
        debug!("{} already measured", current.url);
        return Ok(Some(current));
    }
    if !count_own {
        info!("Rebuilding the dependency list of {}", current.url);
    }

    let policy = ctx.options.failure_policy;
    let Some(id) = settle(policy, &current.url, RepoId::parse(&current.url))? else {
        return Ok(Some(current));
    };
    let dir = ctx.scratch.repository_dir(&id);

    let cloned = ctx
        .collaborators
        .source_control
        .clone_shallow(&id.clone_url(), &dir);
    if settle(policy, &current.url, cloned)?.is_none() {
        return Ok(Some(current));
    }

    let lines = if count_own {
        let counted = ctx.collaborators.line_counter.count_lines(&dir);
        let Some(lines) = settle(policy, &current.url, counted)? else {
            return Ok(Some(current));
        };
        Some(lines)
    } else {
        None
    };

    let manifest_path = dir.join(&ctx.options.ecosystem.manifest_file);
    let dependencies = match settle(policy, &current.url, manifest::from_file(&manifest_path))? {
        Some(parsed) => {
            let dependencies = manifest::resolve_requirements(&parsed, &dir);
            ctx.state.manifests.insert(&current.url, parsed)?;
            dependencies
        }
        None => {
            warn!("{} has no usable manifest, recording no dependencies", current.url);
            Vec::new()
        }
    };
    debug!("{} requires {} modules", current.url, dependencies.len());
    ctx.state.dependencies.merge(&current.url, dependencies)?;

    if let Some(lines) = lines {
        current.own_code_lines = Metric::Done(lines);
        ctx.store().update(&current)?;
    }
    Ok(Some(current))
}

/// A row sized by an earlier run but never resolved has no dependency list
/// in this run's state; its manifest has to be read again.
fn needs_dependency_list(ctx: &Context<'_>, repository: &Repository) -> Result<bool> {
    Ok(repository.needs(Stage::Resolution)
        && ctx.state.dependencies.get(&repository.url)?.is_none())
}
