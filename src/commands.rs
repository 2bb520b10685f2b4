//! CLI command definitions
//!
//! `modcheck <suite> <module>` runs a suite; the subcommands only inspect
//! the suite registry.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "modcheck", about = "Conformance harness for kernel data-structure modules")]
#[command(version, long_about = None, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments of a suite run
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Suite to run (see 'modcheck suites'); ignored with --suite-file
    pub suite: Option<String>,

    /// Name of the kernel module to test
    pub module: Option<String>,

    /// Configuration file (default: ~/.config/modcheck/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Run a suite definition from a YAML file instead of the registry
    #[arg(long)]
    pub suite_file: Option<PathBuf>,

    /// Print the result as JSON instead of the transcript
    #[arg(long)]
    pub json: bool,

    /// Show parameter writes, captured values and debug logs
    #[arg(long, short)]
    pub verbose: bool,

    /// Where to save the log when a run aborts
    #[arg(long)]
    pub failure_log: Option<PathBuf>,

    /// Skip the module artifact check
    #[arg(long)]
    pub no_preflight: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List built-in suites
    Suites,

    /// Print a suite definition as YAML
    Show {
        /// Suite name or alias
        suite: String,
    },
}
