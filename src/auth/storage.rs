//! Client-side key/value storage for credentials.
//!
//! Mirrors the browser's local storage: string values under string keys.
//! `MemoryStorage` backs tests and short-lived clients; `FileStorage`
//! persists to a JSON file so the CLI survives restarts.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dashmap::DashMap;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Key the access token is stored under.
pub const TOKEN_KEY: &str = "token";
/// Key the refresh token is stored under.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is corrupt: {0}")]
    Format(#[from] serde_json::Error),
}

/// String storage keyed by fixed names.
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).map(|v| v.value().clone())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.remove(key);
        Ok(())
    }
}

/// JSON-file storage. The whole map is rewritten on every change.
///
/// Writes are blocking; async callers go through [`Credentials::store`]
/// and [`Credentials::wipe`], which run them on the blocking pool.
///
/// [`Credentials::store`]: crate::auth::Credentials::store
/// [`Credentials::wipe`]: crate::auth::Credentials::wipe
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open `path`, starting empty when the file does not exist yet.
    /// A corrupt file is treated as empty so the user can log in again.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let items = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).unwrap_or_else(|e| {
                    tracing::warn!(path = ?path, error = %e, "Credential file is corrupt, starting empty");
                    BTreeMap::new()
                })
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write to a sibling temp file (created 0o600) and rename it over the
    /// target, so readers never see a partial file.
    fn persist(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let dir = match self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                dir
            }
            None => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(serde_json::to_string_pretty(items)?.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut items);
        self.persist(&items)
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert!(storage.get_item(TOKEN_KEY).is_none());

        storage.set_item(TOKEN_KEY, "abc").unwrap();
        assert_eq!(storage.get_item(TOKEN_KEY).as_deref(), Some("abc"));

        storage.remove_item(TOKEN_KEY).unwrap();
        assert!(storage.get_item(TOKEN_KEY).is_none());
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set_item(TOKEN_KEY, "access").unwrap();
        storage.set_item(REFRESH_TOKEN_KEY, "refresh").unwrap();
        storage.remove_item(TOKEN_KEY).unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert!(reopened.get_item(TOKEN_KEY).is_none());
        assert_eq!(reopened.get_item(REFRESH_TOKEN_KEY).as_deref(), Some("refresh"));
    }

    #[test]
    fn test_corrupt_file_opens_empty_and_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "{\"token\": \"half-writ").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert!(storage.get_item(TOKEN_KEY).is_none());

        storage.set_item(TOKEN_KEY, "fresh").unwrap();
        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get_item(TOKEN_KEY).as_deref(), Some("fresh"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let storage = FileStorage::open(&path).unwrap();
        storage.set_item(TOKEN_KEY, "secret").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }
}
