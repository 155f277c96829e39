//! Run configuration for the sync engine.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use sluice_common::StorageClass;

use crate::error::SyncError;

/// Configuration for a sync run.
///
/// Constructed once per run and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Storage class hint for every write.
    pub storage_class: StorageClass,
    /// Prefixes stripped from local paths to form keys. First match wins.
    pub omit_path_prefixes: Vec<String>,
    /// Individual files to upload.
    pub files: Vec<PathBuf>,
    /// Directory trees to upload.
    pub directories: Vec<PathBuf>,
    /// Concurrent uploads per directory target. Must be set and positive.
    pub parallelism: Option<i64>,
    /// Leave dot files and dot directories under directory targets out.
    pub skip_hidden: bool,
    /// Decide but never write.
    pub dry_run: bool,
    /// Retries after the first failed attempt of a write.
    pub max_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            storage_class: StorageClass::default(),
            omit_path_prefixes: vec!["/".to_string()],
            files: Vec::new(),
            directories: Vec::new(),
            parallelism: None,
            skip_hidden: false,
            dry_run: false,
            max_retries: 2,
        }
    }
}

impl SyncConfig {
    /// Validated worker pool size.
    ///
    /// # Errors
    /// - `parallelism` is unset, zero or negative
    pub fn worker_count(&self) -> Result<NonZeroUsize, SyncError> {
        let value = self
            .parallelism
            .ok_or_else(|| SyncError::configuration("parallelism", "is not set"))?;

        usize::try_from(value)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| {
                SyncError::configuration(
                    "parallelism",
                    format!("must be a positive integer, got {}", value),
                )
            })
    }

    /// Check the configuration before any target is touched.
    ///
    /// # Errors
    /// - No files and no directories configured
    /// - Invalid parallelism
    /// - Empty storage class
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.files.is_empty() && self.directories.is_empty() {
            return Err(SyncError::configuration(
                "files, directories",
                "upload target is empty; configure at least one file or directory",
            ));
        }

        self.worker_count()?;
        StorageClass::new(self.storage_class.as_str())?;

        Ok(())
    }
}
