//! Error taxonomy of a sync run.

use std::path::PathBuf;
use thiserror::Error;

use sluice_common::{Error, ObjectKey};

/// Errors produced while synchronizing.
///
/// Only [`SyncError::Configuration`] stops a run. Every other variant is
/// recorded as the outcome of the file it belongs to.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The run configuration is unusable. Raised before any I/O.
    #[error("Invalid configuration: {field}: {reason}")]
    Configuration { field: String, reason: String },

    /// The remote metadata lookup failed for a reason other than absence.
    #[error("Metadata lookup for '{key}' failed: {source}")]
    StorageLookup {
        key: ObjectKey,
        #[source]
        source: Error,
    },

    /// Writing the object failed permanently or ran out of retries.
    #[error("Upload of '{key}' failed after {attempts} attempt(s): {source}")]
    TransferFailed {
        key: ObjectKey,
        attempts: u32,
        #[source]
        source: Error,
    },

    /// The local file could not be inspected or read.
    #[error("Cannot read {}: {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Build a configuration error for `field`.
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Configuration { .. })
    }
}

impl From<Error> for SyncError {
    fn from(err: Error) -> Self {
        match err {
            Error::Config { field, reason } => SyncError::Configuration { field, reason },
            // Store construction failures surface while preparing a run
            other => SyncError::Configuration {
                field: "store".to_string(),
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_configuration_is_fatal() {
        assert!(SyncError::configuration("parallelism", "must be positive").is_fatal());

        let lookup = SyncError::StorageLookup {
            key: ObjectKey::new("k"),
            source: Error::Network("reset".into()),
        };
        assert!(!lookup.is_fatal());

        let fs = SyncError::FileSystem {
            path: PathBuf::from("/gone"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(!fs.is_fatal());
    }

    #[test]
    fn test_messages_carry_context() {
        let err = SyncError::TransferFailed {
            key: ObjectKey::new("files/a.txt"),
            attempts: 3,
            source: Error::Timeout("put".into()),
        };
        let message = err.to_string();
        assert!(message.contains("files/a.txt"));
        assert!(message.contains("3 attempt"));
    }

    #[test]
    fn test_from_common_config_error() {
        let err: SyncError = Error::config("bucket", "is missing").into();
        match err {
            SyncError::Configuration { field, .. } => assert_eq!(field, "bucket"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
