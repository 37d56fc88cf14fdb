//! Transfer command handler - copying a file to or from a profile's host.

use crate::config::Config;
use crate::credentials::{TerminalPrompt, unlock_profile};
use crate::db::ProfileRepository;
use crate::error::Result;
use crate::session::SshTransport;
use crate::transfer::{self, Direction};
use crate::utils::format_size;

/// Handle the transfer command
pub fn handle_transfer(
    config: &Config,
    repo: &ProfileRepository,
    from: &str,
    to: &str,
) -> Result<()> {
    let plan = transfer::resolve(from, to)?;
    let mut profile = repo.resolve(&plan.profile)?;

    let mut prompt = TerminalPrompt::new(config.mask_input());
    unlock_profile(&mut profile, &mut prompt, config.decryption_retries())?;

    match plan.direction {
        Direction::Upload => println!(
            "Uploading {} to {}:{}",
            plan.local.display(),
            profile.alias,
            plan.remote
        ),
        Direction::Download => println!(
            "Downloading {}:{} to {}",
            profile.alias,
            plan.remote,
            plan.local.display()
        ),
    }

    let mut transport = SshTransport::new();
    let bytes = transfer::execute(&plan, &profile, &mut transport)?;
    println!("Transferred {}", format_size(bytes));
    Ok(())
}
