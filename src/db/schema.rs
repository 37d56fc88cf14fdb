//! Database schema and initialization.

use rusqlite::Connection;
use std::path::Path;

use crate::error::Result;

/// Columns added after the first release. Each is applied only when the
/// table lacks it, so running this on every start is safe.
const COLUMN_MIGRATIONS: &[(&str, &str)] = &[(
    "startup_command",
    "ALTER TABLE ssh_profiles ADD COLUMN startup_command TEXT NOT NULL DEFAULT ''",
)];

/// Open the database at the given path, creating it and the table if needed.
pub fn init_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    let fresh = !path.exists();
    let conn = Connection::open(path)?;

    // Restrict database file permissions to owner-only (contains credentials)
    let _ = crate::utils::restrict_file_permissions(path);

    if fresh {
        tracing::info!(path = %path.display(), "creating new profile database");
    }
    prepare_schema(&conn)?;

    Ok(conn)
}

/// Create missing tables and apply column migrations on an open connection.
pub fn prepare_schema(conn: &Connection) -> Result<()> {
    if !table_exists(conn, "ssh_profiles")? {
        create_tables(conn)?;
    }
    migrate(conn)
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
        [name],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        [table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE ssh_profiles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            alias TEXT NOT NULL UNIQUE,
            host TEXT NOT NULL,
            user TEXT NOT NULL,
            password TEXT,
            private_key BLOB,
            startup_command TEXT NOT NULL DEFAULT '',
            auth_type INTEGER NOT NULL,
            encrypted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            modified_at TEXT NOT NULL
        );

        CREATE INDEX idx_ssh_profiles_alias ON ssh_profiles(alias);
        "#,
    )?;
    Ok(())
}

fn migrate(conn: &Connection) -> Result<()> {
    for (column, statement) in COLUMN_MIGRATIONS {
        if !column_exists(conn, "ssh_profiles", column)? {
            tracing::info!(column, "adding missing column to ssh_profiles");
            conn.execute(statement, [])?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        prepare_schema(&conn).unwrap();
        prepare_schema(&conn).unwrap();
        assert!(table_exists(&conn, "ssh_profiles").unwrap());
        assert!(column_exists(&conn, "ssh_profiles", "startup_command").unwrap());
    }

    #[test]
    fn test_old_table_gains_startup_command_without_losing_rows() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE ssh_profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                alias TEXT NOT NULL UNIQUE,
                host TEXT NOT NULL,
                user TEXT NOT NULL,
                password TEXT,
                private_key BLOB,
                auth_type INTEGER NOT NULL,
                encrypted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                modified_at TEXT NOT NULL
            );
            INSERT INTO ssh_profiles (alias, host, user, password, auth_type, encrypted, created_at, modified_at)
            VALUES ('old', '10.0.0.1', 'root', 'pw', 0, 0, '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00');
            "#,
        )
        .unwrap();

        prepare_schema(&conn).unwrap();

        let (alias, cmd): (String, String) = conn
            .query_row(
                "SELECT alias, startup_command FROM ssh_profiles",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(alias, "old");
        assert_eq!(cmd, "");
    }
}
