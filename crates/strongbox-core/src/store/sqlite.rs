//! SQLite-backed vault store.
//!
//! A single `kv` table in a file database. Values written here are already
//! encrypted or integrity-protected by the layers above; SQLite only has to
//! persist them atomically. `secure_delete` is enabled so deleted pages are
//! overwritten with zeros, which the panic wipe relies on as a best effort.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};

use crate::crypto::primitives::now_iso8601;
use crate::error::{Result, VaultError};
use crate::store::traits::VaultStore;

/// On-disk schema version stored in the `meta` table.
pub const FORMAT_VERSION: &str = "1";

/// SQLite key/value store.
pub struct SqliteVaultStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteVaultStore {
    /// Open (creating if needed) a store at `path`.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::StorageUnavailable` if the parent directory cannot
    /// be created, or a SQLite error if the file is not a database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    VaultError::StorageUnavailable(format!(
                        "Failed to create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Open a store that lives only as long as this value.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA secure_delete = ON;

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        let existing: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'format_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            None => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES ('format_version', ?)",
                    [FORMAT_VERSION],
                )?;
            }
            Some(version) if version != FORMAT_VERSION => {
                return Err(VaultError::StorageUnavailable(format!(
                    "Unsupported vault format version: {}",
                    version
                )));
            }
            Some(_) => {}
        }

        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// File path, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run SQLite's own consistency check.
    pub fn check_integrity(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        let result: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if result != "ok" {
            return Err(VaultError::StorageUnavailable(format!(
                "SQLite integrity check failed: {}",
                result
            )));
        }
        Ok(())
    }

    /// Lock the database connection, returning an error if the mutex is poisoned.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| VaultError::StorageUnavailable("SQLite connection poisoned".to_string()))
    }
}

impl VaultStore for SqliteVaultStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock_conn()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (key, value, now_iso8601()),
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM kv WHERE key = ?", [key])?;
        Ok(())
    }

    fn set_many(&self, items: &[(&str, &str)]) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let updated_at = now_iso8601();
        for (key, value) in items {
            tx.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                (key, value, &updated_at),
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        for key in keys {
            tx.execute("DELETE FROM kv WHERE key = ?", [key])?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl std::fmt::Debug for SqliteVaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVaultStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
