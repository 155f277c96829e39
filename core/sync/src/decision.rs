//! Upload-necessity check.
//!
//! A file is uploaded when its object is missing or the object's size differs
//! from the file's size. Files whose content changed without changing size are
//! considered unchanged.

use std::path::Path;
use tracing::debug;

use sluice_common::ObjectKey;
use sluice_storage::ObjectStore;

use crate::error::SyncError;

/// Decide whether `local_path` has to be written to `key`.
///
/// # Returns
/// - `false` for directories, without contacting the store
/// - `true` when the object is absent or its size differs
/// - `false` when the sizes match
///
/// # Errors
/// - `SyncError::FileSystem` if the local file cannot be inspected
/// - `SyncError::StorageLookup` if the metadata query fails
pub async fn should_upload<S>(
    store: &S,
    local_path: &Path,
    key: &ObjectKey,
) -> Result<bool, SyncError>
where
    S: ObjectStore + ?Sized,
{
    let local = tokio::fs::metadata(local_path)
        .await
        .map_err(|source| SyncError::FileSystem {
            path: local_path.to_path_buf(),
            source,
        })?;

    if local.is_dir() {
        return Ok(false);
    }

    let remote = store
        .head_object(key)
        .await
        .map_err(|source| SyncError::StorageLookup {
            key: key.clone(),
            source,
        })?;

    match remote {
        None => {
            debug!("{} is not in {}, uploading", key, store.name());
            Ok(true)
        }
        Some(meta) if meta.size == local.len() => {
            debug!("{} unchanged ({} bytes)", key, meta.size);
            Ok(false)
        }
        Some(meta) => {
            debug!(
                "{} changed size: remote {} bytes, local {} bytes",
                key,
                meta.size,
                local.len()
            );
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use sluice_common::{Error, StorageClass};
    use sluice_storage::MemoryStore;
    use tempfile::TempDir;

    async fn seed(store: &MemoryStore, key: &str, body: &'static [u8]) {
        store
            .put_object(&ObjectKey::new(key), Bytes::from_static(body), &StorageClass::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_absent_object_uploads() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        std::fs::write(&file, b"hello").unwrap();

        let store = MemoryStore::new();
        assert!(should_upload(&store, &file, &ObjectKey::new("a.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_size_skips() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        std::fs::write(&file, b"hello").unwrap();

        let store = MemoryStore::new();
        seed(&store, "a.txt", b"hello").await;

        assert!(!should_upload(&store, &file, &ObjectKey::new("a.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_size_different_content_skips() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        std::fs::write(&file, b"HELLO").unwrap();

        let store = MemoryStore::new();
        seed(&store, "a.txt", b"hello").await;

        assert!(!should_upload(&store, &file, &ObjectKey::new("a.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_size_change_uploads() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        std::fs::write(&file, b"hello, world").unwrap();

        let store = MemoryStore::new();
        seed(&store, "a.txt", b"hello").await;

        assert!(should_upload(&store, &file, &ObjectKey::new("a.txt")).await.unwrap());
    }

    #[tokio::test]
    async fn test_directory_never_uploads() {
        let temp = TempDir::new().unwrap();
        let store = MemoryStore::new();

        // The empty key would fail a lookup; a directory must short-circuit first.
        assert!(!should_upload(&store, temp.path(), &ObjectKey::new("")).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_local_file() {
        let temp = TempDir::new().unwrap();
        let store = MemoryStore::new();

        let err = should_upload(&store, &temp.path().join("gone"), &ObjectKey::new("gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::FileSystem { .. }));
    }

    #[tokio::test]
    async fn test_lookup_failure() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        std::fs::write(&file, b"x").unwrap();

        let store = MemoryStore::new();
        let err = should_upload(&store, &file, &ObjectKey::new("")).await.unwrap_err();
        match err {
            SyncError::StorageLookup { source, .. } => {
                assert!(matches!(source, Error::InvalidInput(_)))
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
