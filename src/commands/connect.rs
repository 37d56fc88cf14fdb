//! Connect command handler - interactive shell on a profile's host.

use super::picker::select_one;
use crate::config::Config;
use crate::credentials::{TerminalPrompt, unlock_profile};
use crate::db::ProfileRepository;
use crate::error::Result;
use crate::session::{
    CrosstermTerminal, SessionOutcome, ShellIo, SshTransport, interrupt_signal, run_session,
};

/// Handle the connect command - unlock, authenticate and hand over the terminal
pub async fn handle_connect(
    config: &Config,
    repo: &ProfileRepository,
    identifier: Option<String>,
) -> Result<()> {
    let Some(mut profile) = select_one(repo, identifier.as_deref()).await? else {
        return Ok(());
    };

    let mut prompt = TerminalPrompt::new(config.mask_input());
    unlock_profile(&mut profile, &mut prompt, config.decryption_retries())?;

    println!("Connecting to {}@{} ...", profile.user, profile.host);
    let mut transport = SshTransport::new();
    let mut terminal = CrosstermTerminal;
    let report = run_session(
        &mut transport,
        &profile,
        &mut terminal,
        ShellIo::terminal(),
        interrupt_signal(),
    )
    .await?;

    if let SessionOutcome::RemoteError(message) = &report.outcome {
        eprintln!("Error: {}", message);
    }
    println!("{}", report.summary());
    Ok(())
}
