//! # Ls Command Implementation
//!
//! Lists the rows of the repository store. This is a read-only command; a
//! store file that does not exist yet lists as empty.

use anyhow::Result;
use clap::Args;

use depsize::store::RepositoryStore;

use super::{print_table, StoreArgs};

/// List stored repositories
#[derive(Args, Debug)]
pub struct LsArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Only rows on which some stage still has work to do.
    #[arg(long)]
    pub pending: bool,

    /// Print rows as JSON.
    #[arg(long)]
    pub json: bool,

    /// Show only the number of rows.
    #[arg(long)]
    pub count: bool,
}

/// Execute the `ls` command.
pub fn execute(args: LsArgs) -> Result<()> {
    let store = args.store.open()?;
    let rows = if args.pending {
        store.pending()?
    } else {
        store.all()?
    };

    if args.count {
        println!("{}", rows.len());
        return Ok(());
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No repositories stored.");
        return Ok(());
    }

    print_table(&rows);
    println!();
    println!("{} repositories", rows.len());
    Ok(())
}
