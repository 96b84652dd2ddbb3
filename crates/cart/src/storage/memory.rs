//! In-process storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;

use super::{CartStorage, StorageError};

/// In-memory key-value storage.
///
/// Cheap to clone; clones share the same map, so a test can hand one clone
/// to a store and inspect the other. Writes can be made to fail
/// ([`fail_writes`](Self::fail_writes)) or to wait
/// ([`hold_writes`](Self::hold_writes)) to exercise the store's persistence
/// paths.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    inner: Arc<MemoryInner>,
}

#[derive(Debug)]
struct MemoryInner {
    values: RwLock<HashMap<String, String>>,
    fail_writes: AtomicBool,
    gate: watch::Sender<bool>,
    writes: AtomicUsize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            inner: Arc::new(MemoryInner {
                values: RwLock::new(HashMap::new()),
                fail_writes: AtomicBool::new(false),
                gate,
                writes: AtomicUsize::new(0),
            }),
        }
    }

    /// Create storage that already holds `value` under `key`.
    #[must_use]
    pub fn with_value(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage.put(key, value);
        storage
    }

    /// Current value under `key`, bypassing the async interface.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        self.inner
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Make subsequent writes fail (`true`) or succeed (`false`).
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Block writes until [`release_writes`](Self::release_writes).
    pub fn hold_writes(&self) {
        self.inner.gate.send_replace(false);
    }

    /// Let held and future writes proceed.
    pub fn release_writes(&self) {
        self.inner.gate.send_replace(true);
    }

    fn put(&self, key: &str, value: &str) {
        self.inner
            .values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }
}

impl CartStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut gate = self.inner.gate.subscribe();
        gate.wait_for(|open| *open)
            .await
            .map_err(|_| StorageError::Rejected("storage dropped".to_string()))?;

        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Rejected("writes disabled".to_string()));
        }

        self.put(key, value);
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_get_missing() {
        let storage = MemoryStorage::new();
        assert!(storage.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_replaces_value() {
        let storage = MemoryStorage::with_value("k", "old");
        storage.set("k", "new").await.unwrap();

        assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("new"));
        assert_eq!(storage.write_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_value() {
        let storage = MemoryStorage::with_value("k", "old");
        storage.fail_writes(true);

        assert!(matches!(
            storage.set("k", "new").await,
            Err(StorageError::Rejected(_))
        ));
        assert_eq!(storage.value("k").as_deref(), Some("old"));
        assert_eq!(storage.write_count(), 0);
    }

    #[tokio::test]
    async fn test_held_write_waits_for_release() {
        let storage = MemoryStorage::new();
        storage.hold_writes();

        let writer = {
            let storage = storage.clone();
            tokio::spawn(async move { storage.set("k", "v").await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(storage.value("k").is_none());

        storage.release_writes();
        writer.await.unwrap().unwrap();
        assert_eq!(storage.value("k").as_deref(), Some("v"));
    }
}
