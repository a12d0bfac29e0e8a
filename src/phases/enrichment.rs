//! Stage 2: Enrichment
//!
//! Fills the platform metadata of every repository whose commit count is
//! still pending, one metadata query per repository, on the worker pool.
//! Rows that are already enriched pass through untouched.

use log::{debug, info};
use rayon::prelude::*;

use super::{settle, Context};
use crate::error::Result;
use crate::identifier::RepoId;
use crate::model::{Repository, Stage};

/// Executes the enrichment stage.
///
/// Returns every input repository in its latest stored form. A repository
/// whose query failed under the skip policy comes back unchanged with its
/// marker still pending.
pub fn execute(ctx: &Context<'_>, repositories: Vec<Repository>) -> Result<Vec<Repository>> {
    let results = ctx.pool.install(|| {
        repositories
            .par_iter()
            .map(|repository| enrich_one(ctx, repository))
            .collect::<Result<Vec<_>>>()
    })?;

    let enriched: Vec<Repository> = results.into_iter().flatten().collect();
    info!(
        "Enrichment finished: {} of {} repositories have metadata",
        enriched.iter().filter(|r| !r.needs(Stage::Enrichment)).count(),
        enriched.len()
    );
    Ok(enriched)
}

fn enrich_one(ctx: &Context<'_>, repository: &Repository) -> Result<Option<Repository>> {
    let Some(mut current) = ctx.reload(repository)? else {
        return Ok(None);
    };
    if !current.needs(Stage::Enrichment) {
        debug!("{} already enriched", current.url);
        return Ok(Some(current));
    }

    let fetched = RepoId::parse(&current.url)
        .and_then(|id| ctx.collaborators.metadata.repository_metadata(&id));
    let Some(metadata) = settle(ctx.options.failure_policy, &current.url, fetched)? else {
        return Ok(Some(current));
    };

    metadata.apply_to(&mut current);
    ctx.store().update(&current)?;
    debug!("Enriched {}", current.url);
    Ok(Some(current))
}
