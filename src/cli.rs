//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::{Env, WriteStyle};

use crate::commands;

/// depsize - Measure the own-code and dependency-code size of repositories
#[derive(Parser, Debug)]
#[command(name = "depsize")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize log output
    #[arg(long, global = true, value_name = "WHEN", value_enum, default_value = "auto")]
    color: ColorChoice,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover, enrich, measure and resolve repositories
    Fetch(commands::fetch::FetchArgs),

    /// List stored repositories
    Ls(commands::ls::LsArgs),

    /// Show one stored repository
    Show(commands::show::ShowArgs),

    /// Delete one stored repository
    Rm(commands::rm::RmArgs),

    /// Remove stored rows that share a canonical URL
    Prune(commands::prune::PruneArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        self.init_logging();

        match self.command {
            Commands::Fetch(args) => commands::fetch::execute(args),
            Commands::Ls(args) => commands::ls::execute(args),
            Commands::Show(args) => commands::show::execute(args),
            Commands::Rm(args) => commands::rm::execute(args),
            Commands::Prune(args) => commands::prune::execute(args),
        }
    }

    /// `RUST_LOG` wins over `--log-level` when set.
    fn init_logging(&self) {
        let write_style = match self.color {
            ColorChoice::Auto => WriteStyle::Auto,
            ColorChoice::Always => WriteStyle::Always,
            ColorChoice::Never => WriteStyle::Never,
        };
        let _ = env_logger::Builder::from_env(Env::default().default_filter_or(&self.log_level))
            .write_style(write_style)
            .format_target(false)
            .try_init();
    }
}
