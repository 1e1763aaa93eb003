use crate::error::SyncError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Opaque blob store keyed by manager identity.
///
/// Values carry no schema version; whatever is loaded must deserialize into
/// the current state type or it is discarded.
pub trait StateStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Value>, SyncError>;
    fn save(&self, key: &str, value: &Value) -> Result<(), SyncError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }
}

impl StateStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Value>, SyncError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| SyncError::StorageError(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), SyncError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| SyncError::StorageError(e.to_string()))?;
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// One `<key>.json` file per manager inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            SyncError::StorageError(format!("Failed to create {:?}: {}", dir, e))
        })?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StateStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<Value>, SyncError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::StorageError(format!(
                "Failed to read {:?}: {}",
                path, e
            ))),
        }
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), SyncError> {
        let text = serde_json::to_string_pretty(value)?;
        write_private(&self.path_for(key), &text)
    }
}

/// Writes `text` to `path`, readable by the owner only on unix.
pub(crate) fn write_private(path: &Path, text: &str) -> Result<(), SyncError> {
    fs::write(path, text)
        .map_err(|e| SyncError::StorageError(format!("Failed to write {:?}: {}", path, e)))?;

    // Session records and cookies stay private to the user
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)
            .map_err(|e| SyncError::StorageError(e.to_string()))?
            .permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| SyncError::StorageError(e.to_string()))?;
    }

    Ok(())
}

/// Loads `key`, falling back to the default state when nothing usable is stored.
pub(crate) fn load_state<T>(store: &dyn StateStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match store.load(key) {
        Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!("Discarding stored state for '{}': {}", key, e);
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!("Failed to load state for '{}': {}", key, e);
            T::default()
        }
    }
}

/// Saves `state` under `key`. Failures are logged, never propagated.
pub(crate) fn persist<T: Serialize>(store: &dyn StateStore, key: &str, state: &T) {
    let result = serde_json::to_value(state)
        .map_err(SyncError::from)
        .and_then(|value| store.save(key, &value));

    if let Err(e) = result {
        tracing::warn!("Failed to persist state for '{}': {}", key, e);
    }
}
