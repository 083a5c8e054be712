use super::SnapshotStore;
use crate::error::{MiraError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-process snapshot store
///
/// Clones share the same slots, which lets a caller hand one clone to a
/// `SessionStore` and keep another to inspect what was persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all slots currently holding a value
    pub fn slot_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .slots
            .lock()
            .map(|slots| slots.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.slots
            .lock()
            .map_err(|_| MiraError::Storage("memory store lock poisoned".to_string()).into())
    }
}

impl SnapshotStore for MemoryStorage {
    fn load(&self, slot: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(slot).cloned())
    }

    fn save(&self, slot: &str, value: &str) -> Result<()> {
        self.lock()?.insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<()> {
        self.lock()?.remove(slot);
        Ok(())
    }
}
