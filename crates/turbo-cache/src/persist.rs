//! Versioned, hydrate-once persistence on top of [`DurableStorage`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{CacheError, DurableStorage};

/// The durable representation: a schema version plus the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSnapshot<E> {
    pub version: u32,
    pub entries: E,
}

/// Upgrades the `entries` payload of version N to version N + 1.
pub type Migration = Box<dyn Fn(Value) -> Result<Value, CacheError> + Send + Sync>;

/// Stores one snapshot under one namespaced key.
///
/// - `hydrate` reads storage at most once per adapter: after the first
///   successful read every call returns the same in-memory result, even if
///   storage changed underneath. A failed read is not cached and is retried
///   on the next call.
/// - `persist` is best-effort: failures are logged and reported as `false`,
///   never returned as errors.
/// - Unreadable or unknown-version snapshots hydrate as `None`.
pub struct PersistenceAdapter<E> {
    storage: Arc<dyn DurableStorage>,
    key: String,
    version: u32,
    migrations: BTreeMap<u32, Migration>,
    hydrated: Mutex<Option<Option<PersistedSnapshot<E>>>>,
    available: AtomicBool,
}

impl<E> PersistenceAdapter<E>
where
    E: Serialize + DeserializeOwned + Clone,
{
    /// Create an adapter for `key`, writing snapshots at `version`.
    pub fn new(storage: Arc<dyn DurableStorage>, key: impl Into<String>, version: u32) -> Self {
        Self {
            storage,
            key: key.into(),
            version,
            migrations: BTreeMap::new(),
            hydrated: Mutex::new(None),
            available: AtomicBool::new(true),
        }
    }

    /// Register an upgrade from `from_version` to `from_version + 1`.
    pub fn with_migration<F>(mut self, from_version: u32, migrate: F) -> Self
    where
        F: Fn(Value) -> Result<Value, CacheError> + Send + Sync + 'static,
    {
        self.migrations.insert(from_version, Box::new(migrate));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Load the snapshot, once.
    pub fn hydrate(&self) -> Option<PersistedSnapshot<E>> {
        let mut slot = self.hydrated.lock();
        if let Some(cached) = slot.as_ref() {
            return cached.clone();
        }

        let raw = match self.storage.read(&self.key) {
            Ok(raw) => raw,
            Err(e) => {
                self.available.store(false, Ordering::Relaxed);
                tracing::warn!(key = %self.key, error = %e, "durable storage read failed; continuing in memory");
                return None;
            }
        };

        let loaded = match raw {
            None => {
                tracing::debug!(key = %self.key, "no persisted snapshot");
                None
            }
            Some(raw) => match self.decode(&raw) {
                Ok(snapshot) => {
                    tracing::debug!(key = %self.key, version = snapshot.version, "hydrated snapshot");
                    Some(snapshot)
                }
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "discarding unreadable snapshot");
                    None
                }
            },
        };

        *slot = Some(loaded.clone());
        loaded
    }

    /// Whether a hydration read has succeeded.
    pub fn is_hydrated(&self) -> bool {
        self.hydrated.lock().is_some()
    }

    /// Write `entries` at the current version. Returns whether it stuck.
    pub fn persist(&self, entries: &E) -> bool {
        let snapshot = PersistedSnapshot {
            version: self.version,
            entries,
        };
        let result = serde_json::to_string(&snapshot)
            .map_err(CacheError::from)
            .and_then(|json| self.storage.write(&self.key, &json));

        match result {
            Ok(()) => {
                self.available.store(true, Ordering::Relaxed);
                true
            }
            Err(e) => {
                if e.is_unavailable() {
                    self.available.store(false, Ordering::Relaxed);
                }
                tracing::warn!(key = %self.key, error = %e, "persist failed; state kept in memory only");
                false
            }
        }
    }

    /// Remove the durable snapshot. Best-effort like `persist`.
    pub fn clear(&self) -> bool {
        match self.storage.remove(&self.key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to clear persisted snapshot");
                false
            }
        }
    }

    /// False once a read or write has failed because storage is unusable.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    fn decode(&self, raw: &str) -> Result<PersistedSnapshot<E>, CacheError> {
        let mut value: Value = serde_json::from_str(raw)?;
        let found = value
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(CacheError::SchemaMismatch {
                found: 0,
                expected: self.version,
            })?;

        let mut version = found;
        while version < self.version {
            let migrate = self.migrations.get(&version).ok_or(CacheError::SchemaMismatch {
                found,
                expected: self.version,
            })?;
            let entries = value.get_mut("entries").map(Value::take).unwrap_or(Value::Null);
            let upgraded = migrate(entries)?;
            version += 1;
            value = serde_json::json!({ "version": version, "entries": upgraded });
        }

        if version != self.version {
            return Err(CacheError::SchemaMismatch {
                found,
                expected: self.version,
            });
        }

        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use std::collections::BTreeMap;

    type Entries = BTreeMap<String, Vec<u32>>;

    const KEY: &str = "test:snapshot";

    fn entries(pairs: &[(&str, &[u32])]) -> Entries {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect()
    }

    #[test]
    fn test_round_trip_across_adapters() {
        let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::new());
        let state = entries(&[("a", &[1, 2]), ("b", &[])]);

        let writer = PersistenceAdapter::<Entries>::new(storage.clone(), KEY, 1);
        assert!(writer.persist(&state));

        let reader = PersistenceAdapter::<Entries>::new(storage, KEY, 1);
        let snapshot = reader.hydrate().unwrap();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.entries, state);
    }

    #[test]
    fn test_hydrate_is_idempotent() {
        let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::new());
        let adapter = PersistenceAdapter::<Entries>::new(storage.clone(), KEY, 1);
        adapter.persist(&entries(&[("a", &[1])]));

        let first = adapter.hydrate();
        storage
            .write(KEY, r#"{"version":1,"entries":{"z":[9]}}"#)
            .unwrap();
        let second = adapter.hydrate();

        assert_eq!(first, second);
        assert!(adapter.is_hydrated());
    }

    #[test]
    fn test_empty_storage_hydrates_none() {
        let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::new());
        let adapter = PersistenceAdapter::<Entries>::new(storage, KEY, 1);
        assert_eq!(adapter.hydrate(), None);
        assert!(adapter.is_hydrated());
    }

    #[test]
    fn test_unknown_version_degrades_to_none() {
        let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::new());
        storage
            .write(KEY, r#"{"version":7,"entries":{"a":[1]}}"#)
            .unwrap();
        let adapter = PersistenceAdapter::<Entries>::new(storage, KEY, 1);
        assert_eq!(adapter.hydrate(), None);
    }

    #[test]
    fn test_garbage_degrades_to_none() {
        let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::new());
        storage.write(KEY, "{not json").unwrap();
        let adapter = PersistenceAdapter::<Entries>::new(storage, KEY, 1);
        assert_eq!(adapter.hydrate(), None);
    }

    #[test]
    fn test_migration_upgrades_old_snapshot() {
        let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::new());
        // Version 1 stored a single number per key.
        storage
            .write(KEY, r#"{"version":1,"entries":{"a":4}}"#)
            .unwrap();

        let adapter = PersistenceAdapter::<Entries>::new(storage, KEY, 2).with_migration(1, |entries| {
            let Value::Object(map) = entries else {
                return Ok(Value::Object(Default::default()));
            };
            Ok(Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::Array(vec![v])))
                    .collect(),
            ))
        });

        let snapshot = adapter.hydrate().unwrap();
        assert_eq!(snapshot.version, 2);
        assert_eq!(snapshot.entries, entries(&[("a", &[4])]));
    }

    #[test]
    fn test_persist_failure_is_swallowed() {
        let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::disabled());
        let adapter = PersistenceAdapter::<Entries>::new(storage, KEY, 1);

        assert!(!adapter.persist(&entries(&[("a", &[1])])));
        assert!(!adapter.is_available());
        assert_eq!(adapter.hydrate(), None);
        // A failed read is retried rather than cached.
        assert!(!adapter.is_hydrated());
    }
}
