//! Database connection and initialization

use crate::{migrations, Result};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OpenFlags, Transaction};
use std::path::Path;
use std::time::Duration;

/// Time SQLite itself waits on a lock before reporting SQLITE_BUSY
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn open_connection<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path.as_ref(),
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA synchronous=NORMAL;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Refined relational store
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the refined store and bring its schema up to date
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = open_connection(path)?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get connection
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// Run `f` inside one transaction; commits on `Ok`, rolls back on `Err`
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_open_database() {
        let file = NamedTempFile::new().unwrap();
        let result = Database::open(file.path());
        assert!(result.is_ok());
    }

    #[test]
    fn test_reopen_keeps_schema_version() {
        let file = NamedTempFile::new().unwrap();
        drop(Database::open(file.path()).unwrap());
        let db = Database::open(file.path()).unwrap();
        let version = migrations::get_schema_version(&db.conn()).unwrap();
        assert_eq!(version, migrations::SCHEMA_VERSION);
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<()> = db.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO index_pointer (name, pointer) VALUES ('probe', 1)",
                [],
            )?;
            Err(crate::Error::Corrupt("abort".to_string()))
        });
        assert!(result.is_err());
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM index_pointer", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
