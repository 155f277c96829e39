//! Local filesystem object store.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::provider::{ObjectMetadata, ObjectStore};
use sluice_common::{Error, ObjectKey, Result, StorageClass};

/// Local filesystem object store.
///
/// Stores each object as a file below a root directory. Keys are split on
/// `/`; empty segments are ignored, so `/a/b` and `a/b` address the same file.
/// Storage classes have no meaning here and are only logged.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a new local store with the given root directory.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Permission denied
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        // Create root if it doesn't exist (sync for constructor)
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }

        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Convert a key to a filesystem path below the root.
    fn to_fs_path(&self, key: &ObjectKey) -> Result<PathBuf> {
        let mut fs_path = self.root.clone();
        let mut depth = 0;
        for segment in key.segments() {
            if segment == ".." || segment == "." {
                return Err(Error::InvalidInput(format!(
                    "Key segment '{}' not allowed: {}",
                    segment, key
                )));
            }
            fs_path.push(segment);
            depth += 1;
        }
        if depth == 0 {
            return Err(Error::InvalidInput(format!("Key has no path segments: '{}'", key)));
        }
        Ok(fs_path)
    }

    fn create_metadata(key: &ObjectKey, fs_meta: &std::fs::Metadata) -> ObjectMetadata {
        let modified: Option<DateTime<Utc>> = fs_meta.modified().ok().map(|t| t.into());
        ObjectMetadata {
            key: key.clone(),
            size: fs_meta.len(),
            modified,
            etag: modified.map(|m| format!("{}-{}", m.timestamp(), fs_meta.len())),
            storage_class: None,
        }
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn head_object(&self, key: &ObjectKey) -> Result<Option<ObjectMetadata>> {
        let fs_path = self.to_fs_path(key)?;

        match fs::metadata(&fs_path).await {
            Ok(fs_meta) if fs_meta.is_dir() => Err(Error::InvalidInput(format!(
                "Key refers to a directory: {}",
                key
            ))),
            Ok(fs_meta) => Ok(Some(Self::create_metadata(key, &fs_meta))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_object(
        &self,
        key: &ObjectKey,
        body: Bytes,
        storage_class: &StorageClass,
    ) -> Result<ObjectMetadata> {
        let fs_path = self.to_fs_path(key)?;
        debug!("Writing {} ({} bytes, class {})", key, body.len(), storage_class);

        if let Some(parent) = fs_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write next to the target and rename so readers never see a partial object
        let staging = fs_path.with_extension(format!("sluice-{}.tmp", uuid::Uuid::new_v4()));
        let written = match fs::write(&staging, &body).await {
            Ok(()) => fs::rename(&staging, &fs_path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }

        let fs_meta = fs::metadata(&fs_path).await?;
        Ok(Self::create_metadata(key, &fs_meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_put_then_head() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path()).unwrap();
        let key = ObjectKey::new("nested/dir/test.txt");

        store
            .put_object(&key, Bytes::from_static(b"Hello, Local!"), &StorageClass::default())
            .await
            .unwrap();

        let metadata = store.head_object(&key).await.unwrap().unwrap();
        assert_eq!(metadata.size, 13);
        assert_eq!(
            std::fs::read(temp.path().join("nested/dir/test.txt")).unwrap(),
            b"Hello, Local!"
        );
    }

    #[tokio::test]
    async fn test_local_head_missing() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path()).unwrap();

        let result = store.head_object(&ObjectKey::new("absent.txt")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_local_leading_separator_is_ignored() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path()).unwrap();

        store
            .put_object(&ObjectKey::new("/abs/file"), Bytes::from_static(b"12"), &StorageClass::default())
            .await
            .unwrap();

        let metadata = store.head_object(&ObjectKey::new("abs/file")).await.unwrap();
        assert_eq!(metadata.map(|m| m.size), Some(2));
    }

    #[tokio::test]
    async fn test_local_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path().join("bucket")).unwrap();

        let err = store
            .put_object(&ObjectKey::new("../escape"), Bytes::new(), &StorageClass::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(!temp.path().join("escape").exists());
    }

    #[tokio::test]
    async fn test_local_rejects_empty_key() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path()).unwrap();

        let err = store.head_object(&ObjectKey::new("/")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_staging_file() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path()).unwrap();
        std::fs::create_dir_all(temp.path().join("docs/taken")).unwrap();

        let err = store
            .put_object(&ObjectKey::new("docs/taken"), Bytes::from_static(b"x"), &StorageClass::default())
            .await
            .unwrap_err();
        assert!(!err.is_transient());

        let names: Vec<_> = std::fs::read_dir(temp.path().join("docs"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("taken")]);
    }

    #[tokio::test]
    async fn test_key_below_existing_object_is_permanent() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path()).unwrap();
        let class = StorageClass::default();

        store
            .put_object(&ObjectKey::new("report"), Bytes::from_static(b"x"), &class)
            .await
            .unwrap();
        let err = store
            .put_object(&ObjectKey::new("report/2024.csv"), Bytes::from_static(b"y"), &class)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_local_creates_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("a/b/c");
        let store = LocalStore::new(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
    }
}
