use std::path::Path;

use clap::{CommandFactory, Parser};
use tracing::Instrument;

use sshman::cli::{Cli, Commands};
use sshman::commands::{
    handle_config, handle_connect, handle_delete, handle_export, handle_import, handle_list,
    handle_new, handle_transfer, handle_update,
};
use sshman::logging::{self, LogConfig};
use sshman::utils::format_error;
use sshman::{Config, ProfileRepository, Result, SshmanError, init_db};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "command failed");
        report_error(&e);
        std::process::exit(1);
    }
}

/// First line prefixed with `Error:`, the rest verbatim.
fn report_error(e: &SshmanError) {
    let message = format_error(e);
    let mut lines = message.lines();
    eprintln!("Error: {}", lines.next().unwrap_or_default());
    for line in lines {
        eprintln!("{}", line);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.config.as_deref())?;
    if let Some(db_path) = &cli.config.db_path {
        config
            .set_default("database_path", &db_path.to_string_lossy())
            .map_err(SshmanError::config)?;
    }

    if let Err(e) = logging::init(&LogConfig::from_config(&config)) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let span = logging::command_span(command.name());
    dispatch(&config, cli.config.config.as_deref(), command)
        .instrument(span)
        .await
}

fn open_repository(config: &Config) -> Result<ProfileRepository> {
    Ok(ProfileRepository::new(init_db(&config.db_path())?))
}

/// Run one command. Commands that touch profiles open the database inside
/// their arm, so the connection is released before an error reaches `main`.
async fn dispatch(config: &Config, config_file: Option<&Path>, command: Commands) -> Result<()> {
    tracing::info!("command started");

    match command {
        Commands::Version => {
            println!("sshman {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }

        Commands::Config { command } => handle_config(config, config_file, &command),

        Commands::List => {
            let repo = open_repository(config)?;
            handle_list(&repo)
        }

        Commands::Connect { profile } => {
            let repo = open_repository(config)?;
            handle_connect(config, &repo, profile).await
        }

        Commands::New { no_encrypt } => {
            let repo = open_repository(config)?;
            handle_new(config, &repo, no_encrypt)
        }

        Commands::Update { profile } => {
            let repo = open_repository(config)?;
            handle_update(config, &repo, profile).await
        }

        Commands::Delete { profile } => {
            let repo = open_repository(config)?;
            handle_delete(&repo, profile).await
        }

        Commands::Export {
            profile,
            decrypt,
            output,
        } => {
            let repo = open_repository(config)?;
            handle_export(config, &repo, profile, decrypt, output).await
        }

        Commands::Import { file } => {
            let repo = open_repository(config)?;
            handle_import(&repo, &file)
        }

        Commands::Transfer { from, to } => {
            let repo = open_repository(config)?;
            handle_transfer(config, &repo, &from, &to)
        }
    }
}
