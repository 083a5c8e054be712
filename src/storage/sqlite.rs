use super::SnapshotStore;
use crate::error::{MiraError, Result};
use anyhow::Context;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

/// SQLite-backed snapshot store
///
/// All slots live in a single `slots` table keyed by name. A connection is
/// opened per operation, so the store itself is only a path.
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a storage instance that uses the specified database path.
    ///
    /// Missing parent directories are created and the schema is initialized.
    ///
    /// # Examples
    ///
    /// ```
    /// use mira::storage::{SnapshotStore, SqliteStorage};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("mira.db")).unwrap();
    /// storage.save("chat_messages", "[]").unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| MiraError::Storage(format!("{:#}", e)))?;
        }

        let storage = Self { db_path };
        storage.init()?;
        Ok(storage)
    }

    /// Path of the underlying database file
    pub fn db_path(&self) -> &std::path::Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| MiraError::Storage(format!("{:#}", e)))?;
        Ok(conn)
    }

    fn init(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS slots (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| MiraError::Storage(format!("{:#}", e)))?;
        Ok(())
    }
}

impl SnapshotStore for SqliteStorage {
    fn load(&self, slot: &str) -> Result<Option<String>> {
        let conn = self.open()?;
        let value = conn
            .query_row(
                "SELECT value FROM slots WHERE name = ?",
                params![slot],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .context("Failed to query slot")
            .map_err(|e| MiraError::Storage(format!("{:#}", e)))?;
        Ok(value)
    }

    fn save(&self, slot: &str, value: &str) -> Result<()> {
        let conn = self.open()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO slots (name, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![slot, value, now],
        )
        .context("Failed to write slot")
        .map_err(|e| MiraError::Storage(format!("{:#}", e)))?;
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<()> {
        let conn = self.open()?;
        conn.execute("DELETE FROM slots WHERE name = ?", params![slot])
            .context("Failed to delete slot")
            .map_err(|e| MiraError::Storage(format!("{:#}", e)))?;
        Ok(())
    }
}
