//! SQLite storage for the multitree.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so readers do not block the single writer
//! - `busy_timeout = 5s` before a locked database surfaces as a conflict
//! - `foreign_keys = ON` so deleting a node cascades to its links

pub mod loader;
pub mod migrations;
pub mod query;
pub mod schema;

use rusqlite::Connection;
use std::{path::Path, time::Duration};

use crate::error::Result;

/// Busy timeout used for every connection.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the database at `path`, apply runtime pragmas and
/// migrate the schema to the latest version.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or opening,
/// configuring or migrating the database fails.
pub fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut conn = Connection::open(path)?;
    configure_connection(&conn)?;
    migrations::migrate(&mut conn)?;
    tracing::debug!(path = %path.display(), "opened trellis database");

    Ok(conn)
}

/// A migrated private in-memory database.
///
/// # Errors
///
/// Returns an error if the schema cannot be created.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    migrations::migrate(&mut conn)?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_BUSY_TIMEOUT, open};
    use crate::db::migrations;
    use tempfile::TempDir;

    fn temp_db_path() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join("graph.db");
        (dir, path)
    }

    #[test]
    fn open_sets_wal_busy_timeout_and_fk() {
        let (_dir, path) = temp_db_path();
        let conn = open(&path).expect("open db");

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(
            u128::from(busy_timeout_ms),
            DEFAULT_BUSY_TIMEOUT.as_millis()
        );

        let foreign_keys: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("query foreign_keys");
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn open_creates_parent_dir_and_migrates() {
        let (_dir, path) = temp_db_path();
        let conn = open(&path).expect("open db");
        assert!(path.exists());

        let version = migrations::current_schema_version(&conn).expect("schema version query");
        assert_eq!(version, migrations::LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn reopening_keeps_data() {
        let (_dir, path) = temp_db_path();
        {
            let conn = open(&path).expect("first open");
            conn.execute("INSERT INTO nodes (node_name) VALUES ('persisted')", [])
                .expect("insert");
        }
        let conn = open(&path).expect("second open");
        let name: String = conn
            .query_row("SELECT node_name FROM nodes", [], |row| row.get(0))
            .expect("read back");
        assert_eq!(name, "persisted");
    }
}
