//! Stage 1: Discovery
//!
//! Asks the code-search service for up to `count` repositories of the
//! configured ecosystem that carry its manifest file, and records every one
//! the store has not seen before as a bare row with all metrics pending.
//!
//! ## Process
//!
//! 1.  **Search**: one query, results in service order.
//! 2.  **Normalize**: each result goes through [`RepoId::parse`]; results
//!     that normalize to the same canonical URL are folded together.
//! 3.  **Record**: rows are inserted on the worker pool. The store's atomic
//!     check-and-insert decides which ones are new.
//!
//! The returned list holds only newly created rows, so running discovery
//! again against a populated store returns nothing.

use std::collections::HashSet;

use log::{debug, info};
use rayon::prelude::*;

use super::{settle, Context};
use crate::error::Result;
use crate::graphql::SearchQuery;
use crate::identifier::RepoId;
use crate::model::Repository;

/// Executes the discovery stage.
pub fn execute(ctx: &Context<'_>, count: usize) -> Result<Vec<Repository>> {
    let policy = ctx.options.failure_policy;
    let query = SearchQuery {
        language: ctx.options.ecosystem.language.clone(),
        manifest_file: ctx.options.ecosystem.manifest_file.clone(),
        count,
    };

    let names = match settle(
        policy,
        "repository search",
        ctx.collaborators.search.search_repositories(&query),
    )? {
        Some(names) => names,
        None => return Ok(Vec::new()),
    };
    info!("Search returned {} repositories", names.len());

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for name in names.iter().take(count) {
        if let Some(id) = settle(policy, name, RepoId::parse(name))? {
            if seen.insert(id.canonical_url()) {
                candidates.push(id);
            }
        }
    }

    let created = ctx.pool.install(|| {
        candidates
            .par_iter()
            .map(|id| record(ctx, id))
            .collect::<Result<Vec<_>>>()
    })?;

    let discovered: Vec<Repository> = created.into_iter().flatten().collect();
    info!(
        "Discovered {} new repositories ({} already known)",
        discovered.len(),
        candidates.len() - discovered.len()
    );
    Ok(discovered)
}

/// Insert a bare row for `id` unless its canonical URL is already stored.
fn record(ctx: &Context<'_>, id: &RepoId) -> Result<Option<Repository>> {
    let created = ctx
        .store()
        .insert_if_absent(Repository::new(id.name.clone(), id.canonical_url()))?;
    if created.is_none() {
        debug!("{} is already recorded", id);
    }
    Ok(created)
}
