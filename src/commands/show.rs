//! # Show Command Implementation

use anyhow::{bail, Result};
use clap::Args;

use super::{find, StoreArgs};

/// Show one stored repository
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Repository URL (`owner/name`, `host/owner/name` or a full URL).
    #[arg(value_name = "URL")]
    pub url: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Execute the `show` command.
pub fn execute(args: ShowArgs) -> Result<()> {
    let store = args.store.open()?;
    let Some(row) = find(&store, &args.url)? else {
        bail!("No stored repository matches {}", args.url);
    };
    println!("{}", serde_json::to_string_pretty(&row)?);
    Ok(())
}
