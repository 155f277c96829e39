//! Common types used throughout Sluice.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an object inside a bucket.
///
/// Keys are opaque strings derived from local paths. An empty key can be
/// constructed; stores reject it when it is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Create a key from any string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the key is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key split on `/` with empty components dropped.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ObjectKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for ObjectKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Storage class hint passed along with every write.
///
/// The value is forwarded verbatim to the backend (e.g. `STANDARD`,
/// `STANDARD_IA`, `GLACIER`); backends without tiers ignore it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageClass(String);

impl StorageClass {
    /// The default tier.
    pub const STANDARD: &'static str = "STANDARD";

    /// Create a new storage class.
    ///
    /// # Errors
    /// - Returns error if the class is empty or only whitespace
    pub fn new(class: impl Into<String>) -> crate::Result<Self> {
        let class = class.into();
        if class.trim().is_empty() {
            return Err(crate::Error::config(
                "storage_class",
                "storage class cannot be empty",
            ));
        }
        Ok(Self(class))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StorageClass {
    fn default() -> Self {
        Self(Self::STANDARD.to_string())
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
