//! CLI argument parsing structures.

use clap::{Args, Parser};
use std::path::PathBuf;

use super::commands::Commands;

/// Main CLI structure for sshman.
#[derive(Parser, Debug)]
#[command(name = "sshman")]
#[command(about = "Manage SSH connection profiles with encrypted credentials", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global configuration arguments available to all commands.
#[derive(Debug, Default, Args)]
pub struct ConfigArgs {
    /// Config file to load instead of searching the default locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Profile database to use
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}
