//! Delete command handler - removing one or more profiles.

use super::picker::select_many;
use crate::db::ProfileRepository;
use crate::error::Result;
use crate::utils::prompt::confirm;

/// Handle the delete command - confirm, then remove every selected profile
pub async fn handle_delete(repo: &ProfileRepository, identifier: Option<String>) -> Result<()> {
    let targets = select_many(repo, identifier.as_deref()).await?;
    if targets.is_empty() {
        println!("Nothing selected.");
        return Ok(());
    }

    println!("The following profile(s) will be deleted:");
    for profile in &targets {
        println!("  {}", profile.summary());
    }
    if !confirm(&format!("Delete {} profile(s)?", targets.len()))? {
        println!("Cancelled.");
        return Ok(());
    }

    for profile in &targets {
        repo.delete(profile.id)?;
        tracing::info!(id = profile.id, alias = %profile.alias, "profile deleted");
    }

    println!("Deleted {} profile(s).", targets.len());
    Ok(())
}
