//! Profile selection: an explicit identifier, or a fuzzy picker over every
//! stored profile.

use ff::{TuiConfig, create_items_channel, run_tui_with_config};

use crate::db::{Profile, ProfileRepository};
use crate::error::{Result, SshmanError};

/// Show the picker and return the ids of the chosen lines. An empty result
/// means the picker was dismissed.
async fn pick_ids(profiles: &[Profile], multi: bool) -> Result<Vec<i64>> {
    let (tx, rx) = create_items_channel();
    for profile in profiles {
        if tx.send(profile.summary()).await.is_err() {
            break;
        }
    }
    drop(tx);

    let mut tui_config = TuiConfig::fullscreen();
    tui_config.show_help_text = false;

    let selected = run_tui_with_config(rx, multi, tui_config)
        .await
        .map_err(|e| SshmanError::Other(e.to_string()))?;

    Ok(selected
        .iter()
        .filter_map(|(_, line)| selection_id(line))
        .collect())
}

/// Lines are `id alias user@host (auth)`.
fn selection_id(line: &str) -> Option<i64> {
    line.split_whitespace().next()?.parse().ok()
}

fn all_profiles(repo: &ProfileRepository) -> Result<Vec<Profile>> {
    let profiles = repo.get_all()?;
    if profiles.is_empty() {
        return Err(SshmanError::not_found("no profiles found"));
    }
    Ok(profiles)
}

/// Resolve `identifier`, or let the operator pick one profile.
/// `None` means the picker was dismissed.
pub async fn select_one(
    repo: &ProfileRepository,
    identifier: Option<&str>,
) -> Result<Option<Profile>> {
    if let Some(identifier) = identifier {
        return repo.resolve(identifier).map(Some);
    }

    let profiles = all_profiles(repo)?;
    let ids = pick_ids(&profiles, false).await?;
    Ok(ids
        .first()
        .and_then(|id| profiles.into_iter().find(|p| p.id == *id)))
}

/// Resolve `identifier`, or let the operator pick any number of profiles.
pub async fn select_many(
    repo: &ProfileRepository,
    identifier: Option<&str>,
) -> Result<Vec<Profile>> {
    if let Some(identifier) = identifier {
        return Ok(vec![repo.resolve(identifier)?]);
    }

    let profiles = all_profiles(repo)?;
    let ids = pick_ids(&profiles, true).await?;
    repo.get_by_ids(&ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Credential, ProfileInput, prepare_schema};
    use rusqlite::Connection;

    fn repo_with(aliases: &[&str]) -> ProfileRepository {
        let conn = Connection::open_in_memory().unwrap();
        prepare_schema(&conn).unwrap();
        let repo = ProfileRepository::new(conn);
        for alias in aliases {
            repo.create(&ProfileInput {
                alias: alias.to_string(),
                host: "10.0.0.1".into(),
                user: "root".into(),
                credential: Credential::Password("pw".into()),
                encrypted: false,
                startup_command: String::new(),
                created_at: None,
            })
            .unwrap();
        }
        repo
    }

    #[test]
    fn test_selection_id() {
        assert_eq!(selection_id("12 web root@10.0.0.1 (Password)"), Some(12));
        assert_eq!(selection_id(""), None);
        assert_eq!(selection_id("web root@host"), None);
    }

    #[tokio::test]
    async fn test_explicit_identifier_skips_picker() {
        let repo = repo_with(&["web", "db"]);
        let one = select_one(&repo, Some("db")).await.unwrap().unwrap();
        assert_eq!(one.alias, "db");
        let many = select_many(&repo, Some("1")).await.unwrap();
        assert_eq!(many.len(), 1);
        assert_eq!(many[0].alias, "web");
    }

    #[tokio::test]
    async fn test_unknown_identifier_is_not_found() {
        let repo = repo_with(&["web"]);
        let err = select_one(&repo, Some("nope")).await.unwrap_err();
        assert!(matches!(err, SshmanError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_repository_fails_before_picker() {
        let repo = repo_with(&[]);
        let err = select_many(&repo, None).await.unwrap_err();
        assert_eq!(err.to_string(), "no profiles found");
    }
}
