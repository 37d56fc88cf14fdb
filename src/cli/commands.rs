//! Command and subcommand definitions.

use clap::Subcommand;
use std::path::PathBuf;

/// Top-level commands available in sshman.
///
/// Every `profile` argument is a numeric id or an alias. When it is left out
/// an interactive picker is shown.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all stored profiles
    List,
    /// Open an interactive shell on a profile's host
    Connect {
        /// Profile id or alias
        profile: Option<String>,
    },
    /// Create a new profile
    New {
        /// Store the secret in plain text instead of encrypting it
        #[arg(long)]
        no_encrypt: bool,
    },
    /// Edit an existing profile
    Update {
        /// Profile id or alias
        profile: Option<String>,
    },
    /// Delete one or more profiles
    Delete {
        /// Profile id or alias (if not provided, opens a multi-select picker)
        profile: Option<String>,
    },
    /// Export profiles to a CSV file
    Export {
        /// Profile id or alias (if not provided, opens a multi-select picker)
        profile: Option<String>,

        /// Decrypt secrets before writing them out
        #[arg(long)]
        decrypt: bool,

        /// Output file (default: <unix-seconds>.csv)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Import profiles from a CSV file produced by export
    Import {
        /// CSV file to read
        file: PathBuf,
    },
    /// Copy a file to or from a profile's host (one side as profile:path)
    Transfer {
        /// Source: local path or profile:path
        from: String,
        /// Destination: local path or profile:path
        to: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Print the version
    Version,
}

/// Subcommands for `config`.
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a config file with default values
    Init {
        /// Where to write the file (default: ~/.config/sshman/sshman.kdl)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        overwrite: bool,
    },
    /// Print the effective settings
    Show,
}

impl Commands {
    /// Name used for log spans.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::List => "list",
            Commands::Connect { .. } => "connect",
            Commands::New { .. } => "new",
            Commands::Update { .. } => "update",
            Commands::Delete { .. } => "delete",
            Commands::Export { .. } => "export",
            Commands::Import { .. } => "import",
            Commands::Transfer { .. } => "transfer",
            Commands::Config { .. } => "config",
            Commands::Version => "version",
        }
    }
}
