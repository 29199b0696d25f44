//! Durable key-value storage backends.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::CacheError;

/// Synchronous durable string storage, the shape of browser local storage.
///
/// Reads and writes are small and bounded; implementations report disabled
/// storage and quota exhaustion as `CacheError::Unavailable` and
/// `CacheError::QuotaExceeded`.
pub trait DurableStorage: Send + Sync {
    /// Read a value. `Ok(None)` if the key was never written.
    fn read(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write a value, replacing any previous one.
    fn write(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// Process-local storage.
///
/// Can be constructed disabled or with a byte quota to exercise the failure
/// paths of callers.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
    disabled: bool,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects every operation.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    /// Storage that rejects writes larger than `bytes` in total.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    fn check_enabled(&self) -> Result<(), CacheError> {
        if self.disabled {
            return Err(CacheError::Unavailable("storage is disabled".to_string()));
        }
        Ok(())
    }
}

impl DurableStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check_enabled()?;
        Ok(self.values.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.check_enabled()?;
        let mut values = self.values.lock();
        if let Some(limit) = self.quota {
            let others: usize = values
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(CacheError::QuotaExceeded { needed, limit });
            }
        }
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.check_enabled()?;
        self.values.lock().remove(key);
        Ok(())
    }
}

/// One file per key under a directory.
///
/// Writes go to a temporary sibling and are renamed into place, so a crash
/// mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl DurableStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Helper to build storage keys with namespacing.
///
/// # Example
///
/// ```rust
/// use turbo_cache::cache_key;
///
/// let key = cache_key!("turbo-cart", "addon-ledger");
/// assert_eq!(key, "turbo-cart:addon-ledger");
/// ```
#[macro_export]
macro_rules! cache_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.read("k").unwrap(), None);
        storage.write("k", "v").unwrap();
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("v"));
        storage.remove("k").unwrap();
        assert_eq!(storage.read("k").unwrap(), None);
    }

    #[test]
    fn test_memory_disabled() {
        let storage = MemoryStorage::disabled();
        assert!(matches!(storage.read("k"), Err(CacheError::Unavailable(_))));
        assert!(storage.write("k", "v").unwrap_err().is_unavailable());
    }

    #[test]
    fn test_memory_quota() {
        let storage = MemoryStorage::with_quota(10);
        storage.write("k", "12345").unwrap();
        // Overwriting the same key only counts the new value.
        storage.write("k", "123456789").unwrap();
        assert!(matches!(
            storage.write("other", "12345"),
            Err(CacheError::QuotaExceeded { .. })
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("ledger")).unwrap();

        assert_eq!(storage.read("turbo-cart:addon-ledger").unwrap(), None);
        storage.write("turbo-cart:addon-ledger", r#"{"version":1}"#).unwrap();
        assert_eq!(
            storage.read("turbo-cart:addon-ledger").unwrap().as_deref(),
            Some(r#"{"version":1}"#)
        );
        assert!(storage.dir().join("turbo-cart_addon-ledger.json").exists());

        storage.remove("turbo-cart:addon-ledger").unwrap();
        storage.remove("turbo-cart:addon-ledger").unwrap();
        assert_eq!(storage.read("turbo-cart:addon-ledger").unwrap(), None);
    }
}
