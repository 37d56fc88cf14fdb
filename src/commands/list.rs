//! List command handler - printing all stored profiles.

use crate::db::{Profile, ProfileRepository};
use crate::error::{Result, SshmanError};
use crate::utils::render_table;

const HEADER: [&str; 7] = [
    "Id",
    "Alias",
    "User",
    "Host/IP",
    "Authentication",
    "Encrypted",
    "Created At",
];

fn table_row(profile: &Profile) -> Vec<String> {
    vec![
        profile.id.to_string(),
        profile.alias.clone(),
        profile.user.clone(),
        profile.host.clone(),
        profile.auth_type().to_string(),
        if profile.encrypted { "yes" } else { "no" }.to_string(),
        profile.created_at.format("%d.%m.%Y %H:%M").to_string(),
    ]
}

/// Handle the list command - print every profile as an aligned table
pub fn handle_list(repo: &ProfileRepository) -> Result<()> {
    let profiles = repo.get_all()?;
    if profiles.is_empty() {
        return Err(SshmanError::not_found("no profiles found"));
    }

    let rows: Vec<Vec<String>> = profiles.iter().map(table_row).collect();
    print!("{}", render_table(&HEADER, &rows));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Credential, ProfileInput, prepare_schema};
    use chrono::{TimeZone, Utc};
    use rusqlite::Connection;

    #[test]
    fn test_row_never_shows_secret() {
        let conn = Connection::open_in_memory().unwrap();
        prepare_schema(&conn).unwrap();
        let repo = ProfileRepository::new(conn);
        let profile = repo
            .create(&ProfileInput {
                alias: "web".into(),
                host: "example.com".into(),
                user: "deploy".into(),
                credential: Credential::Password("hunter2".into()),
                encrypted: true,
                startup_command: String::new(),
                created_at: Some(Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()),
            })
            .unwrap();

        let row = table_row(&profile);
        assert_eq!(
            row,
            vec!["1", "web", "deploy", "example.com", "Password", "yes", "09.03.2024 14:05"]
        );
        assert!(!row.iter().any(|c| c.contains("hunter2")));
    }

    #[test]
    fn test_empty_repository_is_not_found() {
        let conn = Connection::open_in_memory().unwrap();
        prepare_schema(&conn).unwrap();
        let err = handle_list(&ProfileRepository::new(conn)).unwrap_err();
        assert!(matches!(err, SshmanError::NotFound(_)));
    }
}
