use super::SnapshotStore;
use crate::error::{MiraError, Result};
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Snapshot store keeping one `<slot>.json` file per slot in a directory
///
/// Writes go to a temporary sibling file that is then renamed over the
/// target, so a reader never observes a half-written snapshot.
pub struct JsonDirStorage {
    dir: PathBuf,
}

impl JsonDirStorage {
    /// Create the store, creating `dir` if needed
    pub fn new<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .context("Failed to create snapshot directory")
            .map_err(|e| MiraError::Storage(format!("{:#}", e)))?;
        Ok(Self { dir })
    }

    /// Directory holding the slot files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        let file_stem: String = slot
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_stem))
    }
}

impl SnapshotStore for JsonDirStorage {
    fn load(&self, slot: &str) -> Result<Option<String>> {
        let path = self.slot_path(slot);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MiraError::Storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))
            .into()),
        }
    }

    fn save(&self, slot: &str, value: &str) -> Result<()> {
        let path = self.slot_path(slot);
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, value)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))
            .map_err(|e| MiraError::Storage(format!("{:#}", e)))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))
            .map_err(|e| MiraError::Storage(format!("{:#}", e)))?;
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<()> {
        let path = self.slot_path(slot);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MiraError::Storage(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))
            .into()),
        }
    }
}
