//! Repository for profile CRUD operations.

use super::models::{AuthType, Credential, Profile, ProfileInput};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params, params_from_iter};
use std::sync::{Arc, Mutex};

use crate::error::{Result, SshmanError};

const PROFILE_COLUMNS: &str = "id, alias, host, user, password, private_key, startup_command, \
     auth_type, encrypted, created_at, modified_at";

/// Repository for managing SSH profiles in the database.
pub struct ProfileRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProfileRepository {
    /// Create a new repository with the given connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Insert a new profile. Returns the stored row with its assigned id.
    pub fn create(&self, input: &ProfileInput) -> Result<Profile> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let now = Utc::now();
        let created_at = input.created_at.unwrap_or(now);
        let (password, private_key) = split_credential(&input.credential);

        conn.execute(
            r#"
            INSERT INTO ssh_profiles
                (alias, host, user, password, private_key, startup_command,
                 auth_type, encrypted, created_at, modified_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                input.alias,
                input.host,
                input.user,
                password,
                private_key,
                input.startup_command,
                input.credential.auth_type().as_i64(),
                input.encrypted,
                created_at.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| map_unique_violation(e, &input.alias))?;

        Ok(Profile {
            id: conn.last_insert_rowid(),
            alias: input.alias.clone(),
            host: input.host.clone(),
            user: input.user.clone(),
            credential: input.credential.clone(),
            encrypted: input.encrypted,
            startup_command: input.startup_command.clone(),
            created_at,
            modified_at: now,
        })
    }

    /// Get a profile by its ID.
    pub fn get_by_id(&self, id: i64) -> Result<Option<Profile>> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM ssh_profiles WHERE id = ?", PROFILE_COLUMNS),
                [id],
                |row| Self::row_to_profile(row),
            )
            .optional()?;
        Ok(result)
    }

    /// Get a profile by its alias.
    pub fn get_by_alias(&self, alias: &str) -> Result<Option<Profile>> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM ssh_profiles WHERE alias = ?", PROFILE_COLUMNS),
                [alias],
                |row| Self::row_to_profile(row),
            )
            .optional()?;
        Ok(result)
    }

    /// Get every profile whose id is in `ids`, ordered by id. Unknown ids are
    /// skipped.
    pub fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM ssh_profiles WHERE id IN ({}) ORDER BY id",
            PROFILE_COLUMNS, placeholders
        ))?;

        let profiles = stmt
            .query_map(params_from_iter(ids.iter()), |row| Self::row_to_profile(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(profiles)
    }

    /// List all profiles ordered by id.
    pub fn get_all(&self) -> Result<Vec<Profile>> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM ssh_profiles ORDER BY id",
            PROFILE_COLUMNS
        ))?;

        let profiles = stmt
            .query_map([], |row| Self::row_to_profile(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(profiles)
    }

    /// Overwrite every mutable field of profile `id` and bump `modified_at`.
    pub fn update(&self, id: i64, input: &ProfileInput) -> Result<Profile> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let now = Utc::now();
        let (password, private_key) = split_credential(&input.credential);

        let changed = conn
            .execute(
                r#"
                UPDATE ssh_profiles SET
                    alias = ?1, host = ?2, user = ?3, password = ?4, private_key = ?5,
                    startup_command = ?6, auth_type = ?7, encrypted = ?8, modified_at = ?9
                WHERE id = ?10
                "#,
                params![
                    input.alias,
                    input.host,
                    input.user,
                    password,
                    private_key,
                    input.startup_command,
                    input.credential.auth_type().as_i64(),
                    input.encrypted,
                    now.to_rfc3339(),
                    id,
                ],
            )
            .map_err(|e| map_unique_violation(e, &input.alias))?;

        if changed == 0 {
            return Err(SshmanError::not_found(format!(
                "no profile with id '{}' exists",
                id
            )));
        }

        let created_at: String = conn.query_row(
            "SELECT created_at FROM ssh_profiles WHERE id = ?",
            [id],
            |row| row.get(0),
        )?;

        Ok(Profile {
            id,
            alias: input.alias.clone(),
            host: input.host.clone(),
            user: input.user.clone(),
            credential: input.credential.clone(),
            encrypted: input.encrypted,
            startup_command: input.startup_command.clone(),
            created_at: parse_timestamp(&created_at),
            modified_at: now,
        })
    }

    /// Delete profile `id`. Deleting an id that does not exist is `NotFound`.
    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let changed = conn.execute("DELETE FROM ssh_profiles WHERE id = ?", [id])?;
        if changed == 0 {
            return Err(SshmanError::not_found(format!(
                "no profile with id '{}' exists",
                id
            )));
        }
        Ok(())
    }

    /// Look a profile up by id when `identifier` is an integer, by alias
    /// otherwise.
    pub fn resolve(&self, identifier: &str) -> Result<Profile> {
        let identifier = identifier.trim();
        let found = match identifier.parse::<i64>() {
            Ok(id) => self.get_by_id(id)?,
            Err(_) => self.get_by_alias(identifier)?,
        };
        found.ok_or_else(|| {
            SshmanError::not_found(format!("no profile matches '{}'", identifier))
        })
    }

    // ========================================================================
    // Helper functions
    // ========================================================================

    fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
        let raw_auth: i64 = row.get(7)?;
        let auth_type = AuthType::from_i64(raw_auth)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(7, raw_auth))?;

        let credential = match auth_type {
            AuthType::Password => {
                Credential::Password(row.get::<_, Option<String>>(4)?.unwrap_or_default())
            }
            AuthType::PrivateKey => {
                Credential::PrivateKey(row.get::<_, Option<Vec<u8>>>(5)?.unwrap_or_default())
            }
        };

        Ok(Profile {
            id: row.get(0)?,
            alias: row.get(1)?,
            host: row.get(2)?,
            user: row.get(3)?,
            credential,
            startup_command: row.get(6)?,
            encrypted: row.get(8)?,
            created_at: parse_timestamp(&row.get::<_, String>(9)?),
            modified_at: parse_timestamp(&row.get::<_, String>(10)?),
        })
    }
}

impl Clone for ProfileRepository {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

/// Only the column matching the auth type is written; the other stays NULL.
fn split_credential(credential: &Credential) -> (Option<&str>, Option<&[u8]>) {
    match credential {
        Credential::Password(p) => (Some(p.as_str()), None),
        Credential::PrivateKey(k) => (None, Some(k.as_slice())),
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn map_unique_violation(err: rusqlite::Error, alias: &str) -> SshmanError {
    match &err {
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == ErrorCode::ConstraintViolation && msg.contains("alias") =>
        {
            SshmanError::DuplicateAlias(alias.to_string())
        }
        _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::prepare_schema;

    fn repo() -> ProfileRepository {
        let conn = Connection::open_in_memory().unwrap();
        prepare_schema(&conn).unwrap();
        ProfileRepository::new(conn)
    }

    fn input(alias: &str) -> ProfileInput {
        ProfileInput {
            alias: alias.to_string(),
            host: "10.0.0.5".to_string(),
            user: "deploy".to_string(),
            credential: Credential::Password("pw".to_string()),
            encrypted: false,
            startup_command: String::new(),
            created_at: None,
        }
    }

    #[test]
    fn test_create_then_lookup() {
        let repo = repo();
        let created = repo.create(&input("web")).unwrap();
        let by_id = repo.get_by_id(created.id).unwrap().unwrap();
        let by_alias = repo.get_by_alias("web").unwrap().unwrap();
        assert_eq!(by_id.id, by_alias.id);
        assert_eq!(by_id.credential, Credential::Password("pw".into()));
    }

    #[test]
    fn test_duplicate_alias_is_rejected() {
        let repo = repo();
        repo.create(&input("web")).unwrap();
        let err = repo.create(&input("web")).unwrap_err();
        assert!(matches!(err, SshmanError::DuplicateAlias(ref a) if a == "web"));
        assert_eq!(repo.get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_update_to_taken_alias_is_rejected() {
        let repo = repo();
        repo.create(&input("a")).unwrap();
        let b = repo.create(&input("b")).unwrap();
        let err = repo.update(b.id, &input("a")).unwrap_err();
        assert!(matches!(err, SshmanError::DuplicateAlias(_)));
        assert_eq!(repo.get_by_id(b.id).unwrap().unwrap().alias, "b");
    }

    #[test]
    fn test_update_persists_every_field() {
        let repo = repo();
        let p = repo.create(&input("a")).unwrap();
        let mut changed = input("renamed");
        changed.host = "example.com".into();
        changed.user = "admin".into();
        changed.credential = Credential::PrivateKey(b"KEY".to_vec());
        changed.startup_command = "uptime".into();
        repo.update(p.id, &changed).unwrap();

        let stored = repo.get_by_id(p.id).unwrap().unwrap();
        assert_eq!(stored.alias, "renamed");
        assert_eq!(stored.host, "example.com");
        assert_eq!(stored.user, "admin");
        assert_eq!(stored.auth_type(), AuthType::PrivateKey);
        assert_eq!(stored.credential, Credential::PrivateKey(b"KEY".to_vec()));
        assert_eq!(stored.startup_command, "uptime");
        assert!(stored.modified_at >= p.modified_at);
    }

    #[test]
    fn test_update_and_delete_missing_id() {
        let repo = repo();
        assert!(matches!(
            repo.update(42, &input("x")).unwrap_err(),
            SshmanError::NotFound(_)
        ));
        assert!(matches!(repo.delete(42).unwrap_err(), SshmanError::NotFound(_)));
    }

    #[test]
    fn test_get_by_ids_skips_unknown_and_orders() {
        let repo = repo();
        let a = repo.create(&input("a")).unwrap();
        let b = repo.create(&input("b")).unwrap();
        let found = repo.get_by_ids(&[b.id, 999, a.id]).unwrap();
        let ids: Vec<i64> = found.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert!(repo.get_by_ids(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_by_id_or_alias() {
        let repo = repo();
        let p = repo.create(&input("db")).unwrap();
        assert_eq!(repo.resolve(&p.id.to_string()).unwrap().alias, "db");
        assert_eq!(repo.resolve("db").unwrap().id, p.id);
        assert!(matches!(
            repo.resolve("nope").unwrap_err(),
            SshmanError::NotFound(_)
        ));
    }

    #[test]
    fn test_created_at_is_kept_when_given() {
        let repo = repo();
        let mut i = input("old");
        let when = DateTime::parse_from_rfc3339("2021-03-04T00:00:00+00:00")
            .unwrap()
            .with_timezone(&Utc);
        i.created_at = Some(when);
        let p = repo.create(&i).unwrap();
        assert_eq!(repo.get_by_id(p.id).unwrap().unwrap().created_at, when);
    }
}
