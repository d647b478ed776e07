//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: start the render loop and background jobs
//! - check-config: load and validate the configuration
//! - boards: list registered boards and flag missing ones
//! - jobs: list the jobs the configuration would start, or dry-resolve an import file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Scoreboard - board rotation and interrupt engine
#[derive(Parser, Debug)]
#[command(name = "scoreboard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log to stderr instead of the log file
    #[arg(long, global = true)]
    pub log_to_stderr: bool,

    /// Subcommand to execute (defaults to run)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the scoreboard
    Run {
        /// Starting mode (off_day, scheduled, intermission, post_game)
        #[arg(short, long)]
        mode: Option<String>,

        /// JSON job list to import instead of starting the configured workers
        #[arg(short, long)]
        jobs: Option<PathBuf>,

        /// Don't watch config files for changes
        #[arg(long)]
        no_watch: bool,

        /// Read remote commands from stdin
        #[arg(short, long)]
        remote: bool,
    },

    /// Load and validate the configuration
    CheckConfig,

    /// List registered boards
    Boards,

    /// List the jobs the configuration would schedule
    Jobs {
        /// Resolve every entry of a JSON job list without scheduling it
        #[arg(short, long)]
        import: Option<PathBuf>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Run {
            mode: None,
            jobs: None,
            no_watch: false,
            remote: false,
        }
    }
}
