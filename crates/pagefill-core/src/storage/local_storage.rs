//! Browser localStorage implementation for WebAssembly.

use super::{BoxFuture, Storage, StorageError, StorageResult, StoredSnapshot};

/// Slot storage backed by `window.localStorage`.
///
/// Writes that exceed the browser quota surface as `QuotaExceeded`.
#[derive(Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }

    fn storage() -> StorageResult<web_sys::Storage> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Other("No window object".to_string()))?;
        window
            .local_storage()
            .map_err(|e| StorageError::Other(format!("localStorage error: {:?}", e)))?
            .ok_or_else(|| StorageError::Other("localStorage not available".to_string()))
    }
}

impl Storage for LocalStorage {
    fn save(&self, key: &str, snapshot: &StoredSnapshot) -> BoxFuture<'_, StorageResult<()>> {
        let key = key.to_string();
        let json = snapshot.to_json();
        Box::pin(async move {
            let json = json.map_err(|e| StorageError::Serialization(e.to_string()))?;
            let needed = json.len();
            Self::storage()?
                .set_item(&key, &json)
                // The only failure browsers report here is QuotaExceededError.
                .map_err(|_| StorageError::QuotaExceeded { needed, available: 0 })
        })
    }

    fn load(&self, key: &str) -> BoxFuture<'_, StorageResult<StoredSnapshot>> {
        let key = key.to_string();
        Box::pin(async move {
            let raw = Self::storage()?
                .get_item(&key)
                .map_err(|e| StorageError::Other(format!("localStorage error: {:?}", e)))?
                .ok_or_else(|| StorageError::NotFound(key.clone()))?;
            StoredSnapshot::from_json(&raw).map_err(|e| StorageError::Serialization(e.to_string()))
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, StorageResult<()>> {
        let key = key.to_string();
        Box::pin(async move {
            Self::storage()?
                .remove_item(&key)
                .map_err(|e| StorageError::Other(format!("localStorage error: {:?}", e)))
        })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let key = key.to_string();
        Box::pin(async move {
            let item = Self::storage()?
                .get_item(&key)
                .map_err(|e| StorageError::Other(format!("localStorage error: {:?}", e)))?;
            Ok(item.is_some())
        })
    }
}
