//! # Rm Command Implementation

use anyhow::{bail, Result};
use clap::Args;

use depsize::store::RepositoryStore;

use super::{find, StoreArgs};

/// Delete one stored repository
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Repository URL (`owner/name`, `host/owner/name` or a full URL).
    #[arg(value_name = "URL")]
    pub url: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Execute the `rm` command.
pub fn execute(args: RmArgs) -> Result<()> {
    let store = args.store.open()?;
    let Some(row) = find(&store, &args.url)? else {
        bail!("No stored repository matches {}", args.url);
    };
    store.delete(row.id)?;
    println!("Removed {} (id {})", row.url, row.id);
    Ok(())
}
