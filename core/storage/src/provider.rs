//! Object store trait definition.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sluice_common::{ObjectKey, Result, StorageClass};

/// Metadata for a stored object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Key the object is stored under.
    pub key: ObjectKey,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, if the backend reports one.
    pub modified: Option<DateTime<Utc>>,
    /// ETag or revision ID.
    pub etag: Option<String>,
    /// Storage class the object was written with, if known.
    pub storage_class: Option<StorageClass>,
}

/// Object store capability used by the sync engine.
///
/// Only point lookups and whole-object writes are required. Implementations
/// must be safe for concurrent use by several workers and must classify their
/// failures through [`sluice_common::Error`] so that callers can tell
/// transient from permanent errors.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Get the provider name (e.g., "s3", "local", "memory").
    fn name(&self) -> &str;

    /// Look up the metadata of `key`.
    ///
    /// # Returns
    /// `Ok(None)` when no object exists under the key. Absence is not an error.
    ///
    /// # Errors
    /// - Invalid key
    /// - Network/authentication errors
    async fn head_object(&self, key: &ObjectKey) -> Result<Option<ObjectMetadata>>;

    /// Write `body` under `key`, replacing any existing object.
    ///
    /// A single call is one attempt; retrying is the caller's business.
    /// Writes are idempotent for the same key and body.
    ///
    /// # Errors
    /// - Invalid key
    /// - Network/authentication errors
    async fn put_object(
        &self,
        key: &ObjectKey,
        body: Bytes,
        storage_class: &StorageClass,
    ) -> Result<ObjectMetadata>;
}
