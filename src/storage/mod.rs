//! Snapshot persistence for chat state
//!
//! The session store never writes deltas: every mutation replaces the full
//! JSON value of a named slot. `SnapshotStore` is that contract, and the
//! backends below differ only in where the slots live.

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{MiraError, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub mod json_dir;
pub mod memory;
pub mod sqlite;

pub use json_dir::JsonDirStorage;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// Slot holding the active conversation's messages
pub const MESSAGES_SLOT: &str = "chat_messages";

/// Slot holding the session-summary list
pub const SESSIONS_SLOT: &str = "chat_sessions";

/// Slot holding the id of the active session
pub const ACTIVE_SESSION_SLOT: &str = "active_session";

/// Slot holding the archived transcript of a session that is not active
pub fn transcript_slot(session_id: &str) -> String {
    format!("transcript:{}", session_id)
}

/// Named-slot storage for full JSON snapshots
///
/// `save` replaces the prior value of the slot entirely. `remove` on a
/// missing slot is not an error.
pub trait SnapshotStore: Send {
    /// Read the raw value of a slot, `None` if it was never written
    fn load(&self, slot: &str) -> Result<Option<String>>;

    /// Replace the value of a slot
    fn save(&self, slot: &str, value: &str) -> Result<()>;

    /// Delete a slot
    fn remove(&self, slot: &str) -> Result<()>;
}

/// Open the backend selected in the configuration
///
/// When no path is configured the platform data directory is used
/// (`mira.db` for SQLite, `snapshots/` for JSON files).
pub fn open_store(config: &StorageConfig) -> Result<Box<dyn SnapshotStore>> {
    match config.backend {
        StorageBackend::Sqlite => {
            let path = match &config.path {
                Some(path) => path.clone(),
                None => default_data_dir()?.join("mira.db"),
            };
            tracing::debug!("Opening SQLite snapshot store at {}", path.display());
            Ok(Box::new(SqliteStorage::new_with_path(path)?))
        }
        StorageBackend::Json => {
            let path = match &config.path {
                Some(path) => path.clone(),
                None => default_data_dir()?.join("snapshots"),
            };
            tracing::debug!("Opening JSON snapshot store at {}", path.display());
            Ok(Box::new(JsonDirStorage::new(path)?))
        }
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "mira", "mira")
        .ok_or_else(|| MiraError::Storage("Could not determine data directory".into()))?;
    Ok(proj_dirs.data_dir().to_path_buf())
}
