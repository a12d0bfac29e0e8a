//! # Fetch Command Implementation
//!
//! Runs the complete pipeline: discover up to `--count` repositories, enrich,
//! measure and resolve them, and print what the run produced. Every setting
//! can come from a flag or its environment variable.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use depsize::config::{
    Ecosystem, FailurePolicy, GitHubSettings, PipelineOptions, Settings, SourcegraphSettings,
};
use depsize::defaults;
use depsize::phases::orchestrator::Pipeline;

use super::{print_table, StoreArgs};

/// Discover, enrich, measure and resolve repositories
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Number of repositories to request from the search service.
    #[arg(short = 'n', long, value_name = "N", default_value_t = 10)]
    pub count: usize,

    /// Token for the GitHub GraphQL API.
    #[arg(long, value_name = "TOKEN", env = defaults::ENV_GITHUB_TOKEN, hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub user name, sent as the User-Agent.
    #[arg(long, value_name = "NAME", env = defaults::ENV_GITHUB_USERNAME, default_value = "depsize")]
    pub github_username: String,

    /// GitHub GraphQL endpoint.
    #[arg(long, value_name = "URL", env = defaults::ENV_GITHUB_API, default_value = defaults::GITHUB_GRAPHQL_API)]
    pub github_api: String,

    /// Sourcegraph GraphQL endpoint.
    #[arg(long, value_name = "URL", env = defaults::ENV_SOURCEGRAPH_API, default_value = defaults::SOURCEGRAPH_GRAPHQL_API)]
    pub sourcegraph_api: String,

    /// Optional Sourcegraph access token.
    #[arg(long, value_name = "TOKEN", env = defaults::ENV_SOURCEGRAPH_TOKEN, hide_env_values = true)]
    pub sourcegraph_token: Option<String>,

    /// Worker pool width. Defaults to the available parallelism.
    #[arg(short, long, value_name = "N", env = defaults::ENV_WORKERS)]
    pub workers: Option<usize>,

    /// Scratch directory for clones and downloaded modules.
    #[arg(long, value_name = "DIR", env = defaults::ENV_SCRATCH)]
    pub scratch: Option<PathBuf>,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Timeout for each external command, in seconds.
    #[arg(long, value_name = "SECONDS", env = defaults::ENV_COMMAND_TIMEOUT, default_value_t = 120)]
    pub command_timeout: u64,

    /// What to do when one repository fails: skip or fail-fast.
    #[arg(long, value_name = "POLICY", env = defaults::ENV_FAILURE_POLICY, default_value = "skip")]
    pub failure_policy: FailurePolicy,

    /// Line-counting program (must accept `--json --quiet <dir>`).
    #[arg(long, value_name = "PROGRAM", env = defaults::ENV_LINE_COUNTER, default_value = defaults::LINE_COUNTER)]
    pub line_counter: String,

    /// Resolve dependencies on the worker pool.
    #[arg(long)]
    pub parallel_resolution: bool,

    /// Do not pick up stored repositories left pending by earlier runs.
    #[arg(long)]
    pub no_resume: bool,

    /// Print the resulting rows as JSON.
    #[arg(long)]
    pub json: bool,
}

impl FetchArgs {
    fn settings(&self) -> Settings {
        Settings {
            github: GitHubSettings {
                endpoint: self.github_api.clone(),
                token: self.github_token.clone().unwrap_or_default(),
                username: self.github_username.clone(),
            },
            sourcegraph: SourcegraphSettings {
                endpoint: self.sourcegraph_api.clone(),
                token: self.sourcegraph_token.clone().filter(|t| !t.is_empty()),
            },
            store_path: self.store.path(),
            command_timeout: Duration::from_secs(self.command_timeout),
            line_counter: self.line_counter.clone(),
            pipeline: PipelineOptions {
                workers: self.workers.unwrap_or_else(defaults::default_workers),
                scratch_root: self
                    .scratch
                    .clone()
                    .unwrap_or_else(defaults::default_scratch_root),
                failure_policy: self.failure_policy,
                ecosystem: Ecosystem::default(),
                resume_pending: !self.no_resume,
                parallel_resolution: self.parallel_resolution,
            },
        }
    }
}

/// Execute the `fetch` command.
pub fn execute(args: FetchArgs) -> Result<()> {
    let settings = args.settings();
    let pipeline = Pipeline::from_settings(&settings).context("Failed to set up the pipeline")?;
    let repositories = pipeline.run(args.count).context("Run aborted")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&repositories)?);
        return Ok(());
    }

    if repositories.is_empty() {
        println!("Nothing to do: no new or pending repositories.");
        return Ok(());
    }
    print_table(&repositories);
    let incomplete = repositories.iter().filter(|r| r.is_incomplete()).count();
    println!();
    println!(
        "{} repositories processed, {} complete, {} still pending",
        repositories.len(),
        repositories.len() - incomplete,
        incomplete
    );
    Ok(())
}
