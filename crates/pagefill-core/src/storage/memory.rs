//! In-memory storage implementation.

use super::{BoxFuture, Storage, StorageError, StorageResult, StoredSnapshot};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
///
/// Slots hold serialized JSON, the same as a browser's local storage, so an
/// optional byte quota and corrupted slots can be modeled faithfully.
#[derive(Default)]
pub struct MemoryStorage {
    slots: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage that refuses writes once its slots would exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            slots: RwLock::default(),
            quota: Some(bytes),
        }
    }

    /// Put raw text into a slot, bypassing serialization.
    pub fn insert_raw(&self, key: &str, raw: impl Into<String>) {
        if let Ok(mut slots) = self.slots.write() {
            slots.insert(key.to_string(), raw.into());
        }
    }

    /// Raw text of a slot, if any.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.slots.read().ok().and_then(|slots| slots.get(key).cloned())
    }

    fn lock_error(e: impl std::fmt::Display) -> StorageError {
        StorageError::Other(format!("Lock error: {}", e))
    }
}

impl Storage for MemoryStorage {
    fn save(&self, key: &str, snapshot: &StoredSnapshot) -> BoxFuture<'_, StorageResult<()>> {
        let key = key.to_string();
        let json = snapshot.to_json();
        Box::pin(async move {
            let json = json.map_err(|e| StorageError::Serialization(e.to_string()))?;
            let mut slots = self.slots.write().map_err(Self::lock_error)?;
            if let Some(quota) = self.quota {
                let others: usize = slots
                    .iter()
                    .filter(|(k, _)| **k != key)
                    .map(|(k, v)| k.len() + v.len())
                    .sum();
                let needed = key.len() + json.len();
                let available = quota.saturating_sub(others);
                if needed > available {
                    return Err(StorageError::QuotaExceeded { needed, available });
                }
            }
            slots.insert(key, json);
            Ok(())
        })
    }

    fn load(&self, key: &str) -> BoxFuture<'_, StorageResult<StoredSnapshot>> {
        let key = key.to_string();
        Box::pin(async move {
            let slots = self.slots.read().map_err(Self::lock_error)?;
            let raw = slots.get(&key).ok_or_else(|| StorageError::NotFound(key.clone()))?;
            StoredSnapshot::from_json(raw).map_err(|e| StorageError::Serialization(e.to_string()))
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, StorageResult<()>> {
        let key = key.to_string();
        Box::pin(async move {
            let mut slots = self.slots.write().map_err(Self::lock_error)?;
            slots.remove(&key);
            Ok(())
        })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let key = key.to_string();
        Box::pin(async move {
            let slots = self.slots.read().map_err(Self::lock_error)?;
            Ok(slots.contains_key(&key))
        })
    }
}
