//! Debounced autosave and explicit save/load/reset of the editor state.
//!
//! State machine: `Idle -> Pending -> Saved`, and back to `Idle` on reset or
//! on a failed write. Changes are detected by comparing the document's
//! revision against the last one observed; the first observation only sets
//! the baseline.

use crate::document::EditorDocument;
use crate::schedule::{Debouncer, Duration, Instant};
use crate::storage::{DEFAULT_STORAGE_KEY, Storage, StorageError, StorageResult, StoredSnapshot};
use std::sync::Arc;
use thiserror::Error;

/// Default quiet period before an autosave is written.
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 1000;

/// Where the persistence state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistenceStatus {
    /// Nothing scheduled, nothing known to be saved.
    #[default]
    Idle,
    /// A change is waiting for the debounce delay to elapse.
    Pending,
    /// The slot matches the document as of the last write.
    Saved,
}

/// Why a load produced no snapshot.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("No saved data")]
    Empty,
    #[error("Saved data is corrupted: {0}")]
    Corrupted(String),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for LoadError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(_) => LoadError::Empty,
            StorageError::Serialization(msg) => LoadError::Corrupted(msg),
            other => LoadError::Storage(other),
        }
    }
}

/// Outcome of a scheduled write.
#[derive(Debug)]
pub enum PersistEvent {
    Saved { saved_at: String, field_count: usize },
    Failed(StorageError),
}

/// Manages automatic and explicit document persistence.
pub struct PersistenceManager<S: Storage> {
    /// Storage backend.
    storage: Arc<S>,
    /// Slot the document lives in.
    key: String,
    /// Trailing debounce for autosave.
    debouncer: Debouncer,
    status: PersistenceStatus,
    /// Last document revision seen by `observe` (None before the first look).
    observed_revision: Option<u64>,
    /// Swallow the next observed change (set by `load`).
    suppress_next_change: bool,
    /// Number of explicit saves this session.
    save_count: u32,
    last_saved_at: Option<String>,
}

impl<S: Storage> PersistenceManager<S> {
    /// Create a new manager with the given storage backend.
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            key: DEFAULT_STORAGE_KEY.to_string(),
            debouncer: Debouncer::new(Duration::from_millis(DEFAULT_AUTOSAVE_DELAY_MS)),
            status: PersistenceStatus::Idle,
            observed_revision: None,
            suppress_next_change: false,
            save_count: 0,
            last_saved_at: None,
        }
    }

    /// Use a different slot key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Set the debounce delay. Cancels anything pending.
    pub fn set_delay(&mut self, delay: Duration) {
        self.debouncer = Debouncer::new(delay);
        if self.status == PersistenceStatus::Pending {
            self.status = PersistenceStatus::Idle;
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn status(&self) -> PersistenceStatus {
        self.status
    }

    pub fn save_count(&self) -> u32 {
        self.save_count
    }

    pub fn last_saved_at(&self) -> Option<&str> {
        self.last_saved_at.as_deref()
    }

    /// When the pending autosave will fire, if one is scheduled.
    pub fn pending_due(&self) -> Option<Instant> {
        self.debouncer.pending().map(|handle| handle.due())
    }

    /// Get a reference to the storage backend.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Look at the document and schedule an autosave if it changed.
    /// Returns true if a write was (re)scheduled.
    pub fn observe(&mut self, document: &EditorDocument, now: Instant) -> bool {
        let revision = document.revision();
        match self.observed_revision {
            None => {
                self.observed_revision = Some(revision);
                return false;
            }
            Some(seen) if seen == revision => return false,
            Some(_) => self.observed_revision = Some(revision),
        }

        if self.suppress_next_change {
            self.suppress_next_change = false;
            log::debug!("Skipping autosave for freshly loaded document");
            return false;
        }

        self.debouncer.schedule(now);
        self.status = PersistenceStatus::Pending;
        true
    }

    /// Resynchronize the baseline after the caller applied a loaded snapshot.
    pub fn acknowledge(&mut self, document: &EditorDocument) {
        self.observed_revision = Some(document.revision());
        self.suppress_next_change = false;
    }

    /// Write the document if the debounce delay has elapsed.
    /// Returns None if nothing was due.
    pub async fn poll(&mut self, document: &EditorDocument, now: Instant) -> Option<PersistEvent> {
        if !self.debouncer.take_due(now) {
            return None;
        }
        Some(match self.write(document).await {
            Ok(snapshot) => PersistEvent::Saved {
                saved_at: snapshot.saved_at,
                field_count: snapshot.field_count,
            },
            Err(e) => PersistEvent::Failed(e),
        })
    }

    /// Save immediately, cancelling any pending autosave.
    pub async fn explicit_save(&mut self, document: &EditorDocument) -> StorageResult<StoredSnapshot> {
        self.debouncer.cancel();
        let snapshot = self.write(document).await?;
        self.save_count += 1;
        Ok(snapshot)
    }

    async fn write(&mut self, document: &EditorDocument) -> StorageResult<StoredSnapshot> {
        let snapshot = StoredSnapshot::capture_now(document);
        let result = self.storage.save(&self.key, &snapshot).await;
        match result {
            Ok(()) => {
                log::info!(
                    "Saved {} field(s) to {} at {}",
                    snapshot.field_count,
                    self.key,
                    snapshot.saved_at
                );
                self.status = PersistenceStatus::Saved;
                self.observed_revision = Some(document.revision());
                self.last_saved_at = Some(snapshot.saved_at.clone());
                Ok(snapshot)
            }
            Err(e) => {
                log::error!("Failed to save {}: {}", self.key, e);
                self.status = PersistenceStatus::Idle;
                Err(e)
            }
        }
    }

    /// Read the slot. The caller applies the snapshot; the change that
    /// causes is not autosaved.
    pub async fn load(&mut self) -> Result<StoredSnapshot, LoadError> {
        let result = self.storage.load(&self.key).await;
        match result {
            Ok(snapshot) => {
                log::info!("Loaded {} field(s) from {}", snapshot.texts.len(), self.key);
                self.debouncer.cancel();
                self.suppress_next_change = true;
                self.status = PersistenceStatus::Saved;
                self.last_saved_at = Some(snapshot.saved_at.clone());
                Ok(snapshot)
            }
            Err(e) => {
                let error = LoadError::from(e);
                match &error {
                    LoadError::Empty => log::info!("No saved document in {}", self.key),
                    other => log::warn!("Failed to load {}: {}", self.key, other),
                }
                Err(error)
            }
        }
    }

    /// Clear the slot and the document together.
    ///
    /// The slot goes first. If it cannot be cleared the document and the
    /// schedule are left as they were, so memory never drifts from what the
    /// next load would bring back.
    ///
    /// Not gated internally: callers confirm with the user first.
    pub async fn reset(&mut self, document: &mut EditorDocument) -> StorageResult<()> {
        let result = self.storage.delete(&self.key).await;
        if let Err(e) = result {
            log::error!("Failed to clear {}: {}", self.key, e);
            return Err(e);
        }
        self.debouncer.cancel();
        document.reset();
        self.observed_revision = Some(document.revision());
        self.suppress_next_change = false;
        self.status = PersistenceStatus::Idle;
        self.last_saved_at = None;
        Ok(())
    }
}

/// Create a platform-appropriate storage backend.
#[cfg(not(target_arch = "wasm32"))]
pub fn create_default_storage() -> StorageResult<Arc<crate::storage::FileStorage>> {
    Ok(Arc::new(crate::storage::FileStorage::default_location()?))
}

#[cfg(target_arch = "wasm32")]
pub fn create_default_storage() -> StorageResult<Arc<crate::storage::LocalStorage>> {
    Ok(Arc::new(crate::storage::LocalStorage::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BoxFuture, MemoryStorage, block_on};
    use kurbo::Point;

    const DELAY: Duration = Duration::from_millis(DEFAULT_AUTOSAVE_DELAY_MS);

    fn manager() -> PersistenceManager<MemoryStorage> {
        PersistenceManager::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_first_observation_is_baseline() {
        let mut manager = manager();
        let mut doc = EditorDocument::new();
        doc.create(Point::ZERO);
        assert!(!manager.observe(&doc, Instant::now()));
        assert_eq!(manager.status(), PersistenceStatus::Idle);
    }

    #[test]
    fn test_change_schedules_write() {
        let mut manager = manager();
        let mut doc = EditorDocument::new();
        let t0 = Instant::now();
        manager.observe(&doc, t0);

        doc.create(Point::ZERO);
        assert!(manager.observe(&doc, t0));
        assert_eq!(manager.status(), PersistenceStatus::Pending);
        assert_eq!(manager.pending_due(), Some(t0 + DELAY));

        assert!(block_on(manager.poll(&doc, t0 + Duration::from_millis(500))).is_none());
        let event = block_on(manager.poll(&doc, t0 + DELAY)).unwrap();
        assert!(matches!(event, PersistEvent::Saved { field_count: 1, .. }));
        assert_eq!(manager.status(), PersistenceStatus::Saved);
        assert!(manager.storage().raw(DEFAULT_STORAGE_KEY).is_some());
    }

    #[test]
    fn test_failed_write_returns_to_idle() {
        let mut manager = PersistenceManager::new(Arc::new(MemoryStorage::with_quota(16)));
        let mut doc = EditorDocument::new();
        let t0 = Instant::now();
        manager.observe(&doc, t0);
        doc.create(Point::ZERO);
        manager.observe(&doc, t0);

        let event = block_on(manager.poll(&doc, t0 + DELAY)).unwrap();
        assert!(matches!(event, PersistEvent::Failed(StorageError::QuotaExceeded { .. })));
        assert_eq!(manager.status(), PersistenceStatus::Idle);
    }

    #[test]
    fn test_explicit_save_cancels_pending_and_counts() {
        let mut manager = manager();
        let mut doc = EditorDocument::new();
        let t0 = Instant::now();
        manager.observe(&doc, t0);
        doc.create(Point::ZERO);
        manager.observe(&doc, t0);

        block_on(manager.explicit_save(&doc)).unwrap();
        assert_eq!(manager.save_count(), 1);
        assert_eq!(manager.status(), PersistenceStatus::Saved);
        assert!(manager.pending_due().is_none());
        assert!(block_on(manager.poll(&doc, t0 + DELAY)).is_none());
        assert!(manager.last_saved_at().is_some());
    }

    #[test]
    fn test_load_empty_and_corrupted() {
        let mut manager = manager();
        assert!(matches!(block_on(manager.load()), Err(LoadError::Empty)));

        manager.storage().insert_raw(DEFAULT_STORAGE_KEY, "{{{");
        assert!(matches!(block_on(manager.load()), Err(LoadError::Corrupted(_))));
    }

    #[test]
    fn test_load_suppresses_next_autosave() {
        let mut manager = manager();
        let mut doc = EditorDocument::new();
        let t0 = Instant::now();
        manager.observe(&doc, t0);
        doc.create(Point::ZERO);
        block_on(manager.explicit_save(&doc)).unwrap();

        let snapshot = block_on(manager.load()).unwrap();
        doc.apply_snapshot(snapshot);

        assert!(!manager.observe(&doc, t0));
        assert!(manager.pending_due().is_none());

        // The next real edit is saved again.
        doc.create(Point::new(300.0, 300.0));
        assert!(manager.observe(&doc, t0));
    }

    #[test]
    fn test_acknowledge_resyncs_baseline() {
        let mut manager = manager();
        let mut doc = EditorDocument::new();
        let t0 = Instant::now();
        manager.observe(&doc, t0);
        doc.create(Point::ZERO);
        block_on(manager.explicit_save(&doc)).unwrap();

        let snapshot = block_on(manager.load()).unwrap();
        doc.apply_snapshot(snapshot);
        manager.acknowledge(&doc);
        assert!(!manager.observe(&doc, t0));

        // Suppression does not linger after acknowledge.
        doc.create(Point::new(200.0, 0.0));
        assert!(manager.observe(&doc, t0));
    }

    #[test]
    fn test_reset_clears_slot_and_document() {
        let mut manager = manager();
        let mut doc = EditorDocument::new();
        let t0 = Instant::now();
        manager.observe(&doc, t0);
        doc.set_background_image("data:image/png;base64,AAAA");
        doc.create(Point::ZERO);
        block_on(manager.explicit_save(&doc)).unwrap();
        doc.create(Point::new(300.0, 0.0));
        manager.observe(&doc, t0);

        block_on(manager.reset(&mut doc)).unwrap();
        assert!(doc.is_empty());
        assert!(!doc.has_background());
        assert_eq!(manager.status(), PersistenceStatus::Idle);
        assert!(manager.storage().raw(DEFAULT_STORAGE_KEY).is_none());
        // The reset itself is not written back.
        assert!(!manager.observe(&doc, t0));
        assert!(block_on(manager.poll(&doc, t0 + DELAY)).is_none());
    }

    /// Memory storage whose slots can be written but never cleared.
    struct StickyStorage(MemoryStorage);

    impl Storage for StickyStorage {
        fn save(&self, key: &str, snapshot: &StoredSnapshot) -> BoxFuture<'_, StorageResult<()>> {
            self.0.save(key, snapshot)
        }
        fn load(&self, key: &str) -> BoxFuture<'_, StorageResult<StoredSnapshot>> {
            self.0.load(key)
        }
        fn delete(&self, _key: &str) -> BoxFuture<'_, StorageResult<()>> {
            Box::pin(async { Err(StorageError::Io("read-only".to_string())) })
        }
        fn exists(&self, key: &str) -> BoxFuture<'_, StorageResult<bool>> {
            self.0.exists(key)
        }
    }

    #[test]
    fn test_failed_reset_keeps_document_and_slot_in_step() {
        let mut manager = PersistenceManager::new(Arc::new(StickyStorage(MemoryStorage::new())));
        let mut doc = EditorDocument::new();
        let t0 = Instant::now();
        manager.observe(&doc, t0);
        doc.create(Point::ZERO);
        block_on(manager.explicit_save(&doc)).unwrap();
        let revision = doc.revision();

        assert!(block_on(manager.reset(&mut doc)).is_err());
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.revision(), revision);
        assert_eq!(manager.status(), PersistenceStatus::Saved);

        assert!(!manager.observe(&doc, t0));
        assert!(block_on(manager.poll(&doc, t0 + Duration::from_secs(10))).is_none());
        let stored = block_on(manager.storage().load(DEFAULT_STORAGE_KEY)).unwrap();
        assert_eq!(stored.field_count, doc.len());
    }
}
