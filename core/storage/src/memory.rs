//! In-memory object store for testing.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::provider::{ObjectMetadata, ObjectStore};
use sluice_common::{Error, ObjectKey, Result, StorageClass};

/// In-memory storage entry.
#[derive(Debug, Clone)]
struct Entry {
    body: Bytes,
    metadata: ObjectMetadata,
}

/// In-memory object store.
///
/// Useful for testing and dry experiments. All data is stored in memory
/// and lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<ObjectKey, Entry>>,
    puts: AtomicUsize,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<ObjectKey, Entry>>> {
        self.objects
            .read()
            .map_err(|_| Error::Storage("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<ObjectKey, Entry>>> {
        self.objects
            .write()
            .map_err(|_| Error::Storage("memory store lock poisoned".to_string()))
    }

    fn check_key(key: &ObjectKey) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidInput("Object key cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.read().map(|objects| objects.len()).unwrap_or(0)
    }

    /// Check if the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<ObjectKey> {
        let mut keys: Vec<ObjectKey> = self
            .read()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Body of the object stored under `key`.
    pub fn get(&self, key: &ObjectKey) -> Option<Bytes> {
        self.read()
            .ok()
            .and_then(|objects| objects.get(key).map(|entry| entry.body.clone()))
    }

    /// Total number of successful writes since creation.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn head_object(&self, key: &ObjectKey) -> Result<Option<ObjectMetadata>> {
        Self::check_key(key)?;
        Ok(self.read()?.get(key).map(|entry| entry.metadata.clone()))
    }

    async fn put_object(
        &self,
        key: &ObjectKey,
        body: Bytes,
        storage_class: &StorageClass,
    ) -> Result<ObjectMetadata> {
        Self::check_key(key)?;

        let metadata = ObjectMetadata {
            key: key.clone(),
            size: body.len() as u64,
            modified: Some(Utc::now()),
            etag: Some(Uuid::new_v4().to_string()),
            storage_class: Some(storage_class.clone()),
        };

        self.write()?.insert(
            key.clone(),
            Entry {
                body,
                metadata: metadata.clone(),
            },
        );
        self.puts.fetch_add(1, Ordering::SeqCst);

        Ok(metadata)
    }
}
