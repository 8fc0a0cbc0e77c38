pub mod history;
pub mod live;
pub mod models;

use chrono::NaiveDate;
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

pub use history::HistoryDb;
pub use live::LiveDb;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Snapshot for {0} is already archived")]
    AlreadyArchived(NaiveDate),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Schema version written to `user_version` after migrating.
const SCHEMA_VERSION: i32 = 1;

/// Open a SQLite file, creating parent directories as needed.
fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    configure(&conn, true)?;
    Ok(conn)
}

fn open_memory_connection() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn, false)?;
    Ok(conn)
}

fn configure(conn: &Connection, file_backed: bool) -> Result<()> {
    if file_backed {
        // In-memory databases have no WAL
        conn.pragma_update(None, "journal_mode", "WAL")?;
    }
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(())
}

/// Run `schema` once per database file, tracked through `user_version`.
fn migrate(conn: &Connection, schema: &str) -> Result<()> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "database schema v{version} is newer than supported v{SCHEMA_VERSION}"
        )));
    }

    if version < 1 {
        conn.execute_batch(schema)?;
        log::debug!("Applied schema v1");
    }

    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_reports_unusable_parent() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "file").unwrap();

        let err = LiveDb::open(&blocker.join("live.db")).err().unwrap();
        assert!(matches!(err, DbError::Io(_)), "got {err}");
    }

    #[test]
    fn test_open_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        std::fs::write(&path, vec![0x42u8; 4096]).unwrap();

        assert!(HistoryDb::open(&path).is_err());
    }

    #[test]
    fn test_reopen_keeps_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.db");
        drop(LiveDb::open(&path).unwrap());

        let db = LiveDb::open(&path).unwrap();
        let version: i32 = db.conn.pragma_query_value(None, "user_version", |row| row.get(0)).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }
}
