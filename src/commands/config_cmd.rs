//! Config command handlers - writing and showing configuration.

use std::path::Path;

use crate::cli::ConfigCommands;
use crate::config::Config;
use crate::error::Result;

/// Handle `config init` and `config show`
pub fn handle_config(
    config: &Config,
    explicit: Option<&Path>,
    command: &ConfigCommands,
) -> Result<()> {
    match command {
        ConfigCommands::Init { path, overwrite } => {
            let config_path = Config::generate_config_file(path.clone(), *overwrite)?;
            println!("Config file generated at: {}", config_path.display());
        }
        ConfigCommands::Show => {
            let source = explicit
                .map(Path::to_path_buf)
                .or_else(Config::find_existing_config);
            match source {
                Some(path) => println!("// loaded from {}", path.display()),
                None => println!("// no config file found, using defaults"),
            }
            print!("{}", config.to_kdl());
        }
    }
    Ok(())
}
