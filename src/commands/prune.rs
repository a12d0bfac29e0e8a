//! # Prune Command Implementation
//!
//! Runs the deduplication sweep: rows sharing a canonical URL are reduced to
//! the one with the lowest id.

use anyhow::Result;
use clap::Args;

use depsize::store::prune_duplicates;

use super::StoreArgs;

/// Remove stored rows that share a canonical URL
#[derive(Args, Debug)]
pub struct PruneArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

/// Execute the `prune` command.
pub fn execute(args: PruneArgs) -> Result<()> {
    let store = args.store.open()?;
    let removed = prune_duplicates(&store)?;
    println!("Removed {} duplicate row(s)", removed);
    Ok(())
}
