use super::{BackendError, KeyValueStore};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Every key lives in one JSON object on disk. Each write rewrites the whole
/// file through a temp file and rename, so a crash never leaves it half
/// written.
pub struct JsonFileStore {
    path: PathBuf,
    quota_bytes: Option<u64>,
    // Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            quota_bytes: None,
            lock: Mutex::new(()),
        }
    }

    pub fn with_quota(mut self, quota_bytes: Option<u64>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, BackendError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        Ok(serde_json::from_str(&contents)?)
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), BackendError> {
        let json = serde_json::to_string_pretty(entries)?;

        if let Some(limit) = self.quota_bytes {
            let needed = json.len() as u64;
            if needed > limit {
                return Err(BackendError::QuotaExceeded { needed, limit });
            }
        }

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let mut file = tempfile::NamedTempFile::new_in(&parent)?;
        file.write_all(json.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| BackendError::Io(e.error))?;
        Ok(())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, BackendError> {
        self.lock
            .lock()
            .map_err(|e| BackendError::Storage(format!("Failed to lock store file: {}", e)))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let _guard = self.guard()?;
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let _guard = self.guard()?;
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        let _guard = self.guard()?;
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }

    /// Overwrites the file with an empty object without reading it first, so
    /// a file that no longer parses can still be recovered.
    fn clear(&self) -> Result<(), BackendError> {
        let _guard = self.guard()?;
        self.write_entries(&BTreeMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_store_persists_across_instances() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("store.json");

        let store = JsonFileStore::new(&path);
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_json_store_empty_file_is_empty_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("store.json");
        std::fs::write(&path, "  \n").unwrap();

        let store = JsonFileStore::new(&path);
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_json_store_rejects_writes_over_quota() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("store.json");
        let store = JsonFileStore::new(&path).with_quota(Some(64));

        store.set("small", "x").unwrap();
        let err = store.set("big", &"y".repeat(200)).unwrap_err();
        assert!(matches!(err, BackendError::QuotaExceeded { limit: 64, .. }));

        // The rejected write leaves the previous contents intact.
        assert_eq!(store.get("small").unwrap().as_deref(), Some("x"));
        assert_eq!(store.get("big").unwrap(), None);
    }

    #[test]
    fn test_json_store_corrupt_file_is_a_read_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.get("a"),
            Err(BackendError::Serialization(_))
        ));
    }

    #[test]
    fn test_json_store_clear_recovers_corrupt_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("store.json");
        std::fs::write(&path, "garbage").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.remove("a").is_err());
        store.clear().unwrap();

        assert_eq!(store.get("a").unwrap(), None);
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }
}
