//! Persistence: the slot abstraction, its backends, and the autosave
//! state machine on top.

mod autosave;
mod memory;
mod snapshot;

#[cfg(not(target_arch = "wasm32"))]
mod file;

#[cfg(target_arch = "wasm32")]
mod local_storage;

pub use autosave::{
    DEFAULT_AUTOSAVE_DELAY_MS, LoadError, PersistEvent, PersistenceManager, PersistenceStatus,
    create_default_storage,
};
pub use memory::MemoryStorage;
pub use snapshot::{SAVED_AT_FORMAT, StoredSnapshot};

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

#[cfg(target_arch = "wasm32")]
pub use local_storage::LocalStorage;

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Name of the durable slot holding the editor state.
pub const DEFAULT_STORAGE_KEY: &str = "pagefill.document";

/// Why a storage operation failed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Nothing stored under {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage quota exceeded ({needed} bytes needed, {available} available)")]
    QuotaExceeded { needed: usize, available: usize },
    #[error("Storage error: {0}")]
    Other(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Future returned by the storage and collaborator seams. Not `Send`, so the
/// same signatures work on the single-threaded browser target.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// `Send + Sync` on native targets, nothing on wasm where everything runs
/// on one thread.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSendSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSendSync for T {}

/// Durable slots, each holding one serialized snapshot under a string key.
pub trait Storage: MaybeSendSync {
    /// Replace the slot's contents.
    fn save(&self, key: &str, snapshot: &StoredSnapshot) -> BoxFuture<'_, StorageResult<()>>;

    /// `NotFound` for an empty slot, `Serialization` for one that does not parse.
    fn load(&self, key: &str) -> BoxFuture<'_, StorageResult<StoredSnapshot>>;

    /// Empty the slot. Already empty is fine.
    fn delete(&self, key: &str) -> BoxFuture<'_, StorageResult<()>>;

    fn exists(&self, key: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

/// Poll a future to completion on the current thread.
#[cfg(test)]
pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    use std::task::{Context, Poll, Waker};

    let mut cx = Context::from_waker(Waker::noop());
    let mut future = std::pin::pin!(future);
    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return output;
        }
    }
}
