//! Durable key-value store for the write-through document cache.

use chrono::Utc;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use resumesync_core::persistence::LocalStore;
use resumesync_core::StorageError;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS local_documents (
    key        TEXT PRIMARY KEY NOT NULL,
    payload    TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

fn storage_err(err: rusqlite::Error) -> StorageError {
    StorageError::backend(err.to_string())
}

/// Metadata for one cached entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: String,
    pub size_bytes: usize,
    pub updated_at: String,
}

/// Single-connection SQLite store. Writes are committed before `put` returns.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(storage_err)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
            .map_err(storage_err)?;
        conn.pragma_update(None, "synchronous", "FULL")
            .map_err(storage_err)?;
        let store = Self::with_connection(conn)?;
        info!("[LocalStore] Opened {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory().map_err(storage_err)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA_SQL).map_err(storage_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Cached entries, most recently written first.
    pub fn entries(&self) -> Result<Vec<StoredEntry>, StorageError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT key, length(payload), updated_at FROM local_documents ORDER BY updated_at DESC",
            )
            .map_err(storage_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StoredEntry {
                    key: row.get(0)?,
                    size_bytes: row.get::<_, i64>(1)?.max(0) as usize,
                    updated_at: row.get(2)?,
                })
            })
            .map_err(storage_err)?;
        let entries = rows.collect::<Result<Vec<_>, _>>().map_err(storage_err)?;
        Ok(entries)
    }
}

impl LocalStore for SqliteStore {
    fn put(&self, key: &str, json: &str) -> Result<(), StorageError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO local_documents (key, payload, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
            params![key, json, Utc::now().to_rfc3339()],
        )
        .map_err(storage_err)?;
        debug!("[LocalStore] put {} ({} bytes)", key, json.len());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.connection()?;
        conn.query_row(
            "SELECT payload FROM local_documents WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(storage_err)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.connection()?;
        conn.execute("DELETE FROM local_documents WHERE key = ?1", params![key])
            .map_err(storage_err)?;
        Ok(())
    }
}
