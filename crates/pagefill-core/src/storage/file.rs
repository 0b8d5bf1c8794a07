//! Slots as JSON files in one directory (native only).

use super::{BoxFuture, Storage, StorageError, StorageResult, StoredSnapshot};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Keeps each slot in `<dir>/<key>.json`.
///
/// Writes land in a sibling `.tmp` file first and are renamed over the slot,
/// so a crash mid-write leaves the previous save intact.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir`, creating it if needed.
    pub fn new(dir: PathBuf) -> StorageResult<Self> {
        fs::create_dir_all(&dir).map_err(|e| io_error("create", &dir, e))?;
        Ok(Self { dir })
    }

    /// The per-user data directory (`~/.local/share/pagefill` on Linux),
    /// falling back to the home directory.
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("no data or home directory".to_string()))?;
        Self::new(base.join("pagefill"))
    }

    pub fn base_path(&self) -> &Path {
        &self.dir
    }

    /// Keys become file names; anything outside `[A-Za-z0-9._-]` maps to `_`.
    fn slot_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Io(format!("cannot {} {}: {}", action, path.display(), e))
}

impl Storage for FileStorage {
    fn save(&self, key: &str, snapshot: &StoredSnapshot) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.slot_path(key);
        let json = snapshot.to_json();
        Box::pin(async move {
            let json = json.map_err(|e| StorageError::Serialization(e.to_string()))?;
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, json).map_err(|e| io_error("write", &tmp, e))?;
            fs::rename(&tmp, &path).map_err(|e| io_error("replace", &path, e))
        })
    }

    fn load(&self, key: &str) -> BoxFuture<'_, StorageResult<StoredSnapshot>> {
        let path = self.slot_path(key);
        let key = key.to_string();
        Box::pin(async move {
            let json = match fs::read_to_string(&path) {
                Ok(json) => json,
                Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound(key)),
                Err(e) => return Err(io_error("read", &path, e)),
            };
            StoredSnapshot::from_json(&json)
                .map_err(|e| StorageError::Serialization(format!("{}: {}", path.display(), e)))
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.slot_path(key);
        Box::pin(async move {
            match fs::remove_file(&path) {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(io_error("delete", &path, e)),
                _ => Ok(()),
            }
        })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.slot_path(key);
        Box::pin(async move { Ok(path.is_file()) })
    }
}
