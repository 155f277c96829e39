//! Classification of configured paths into upload targets.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::SyncConfig;

/// A configured local path, tagged with how it is synchronized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTarget {
    /// A single file uploaded as one object.
    File(PathBuf),
    /// A tree whose regular files are uploaded; never an object itself.
    Directory(PathBuf),
}

impl UploadTarget {
    /// Local path of the target.
    pub fn path(&self) -> &Path {
        match self {
            UploadTarget::File(path) | UploadTarget::Directory(path) => path,
        }
    }
}

/// Intake for a configured file path.
///
/// Directories configured as files are dropped. Paths that cannot be
/// inspected stay file targets so that the failure is reported per file.
pub async fn classify_file(path: &Path) -> Option<UploadTarget> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => {
            info!("Skipping {}: configured as a file but is a directory", path.display());
            None
        }
        _ => Some(UploadTarget::File(path.to_path_buf())),
    }
}

/// Intake for a configured directory path.
///
/// Missing paths and paths that are not directories are dropped.
pub async fn classify_directory(path: &Path) -> Option<UploadTarget> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Some(UploadTarget::Directory(path.to_path_buf())),
        Ok(_) => {
            info!("Skipping {}: configured as a directory but is not one", path.display());
            None
        }
        Err(e) => {
            info!("Skipping directory {}: {}", path.display(), e);
            None
        }
    }
}

/// Classified targets of a run, files first, each group in configured order.
#[derive(Debug, Clone, Default)]
pub struct Targets {
    pub files: Vec<UploadTarget>,
    pub directories: Vec<UploadTarget>,
}

impl Targets {
    /// Classify every configured path once.
    pub async fn collect(config: &SyncConfig) -> Self {
        let mut targets = Self::default();

        for path in &config.files {
            if let Some(target) = classify_file(path).await {
                targets.files.push(target);
            }
        }
        for path in &config.directories {
            if let Some(target) = classify_directory(path).await {
                targets.directories.push(target);
            }
        }

        debug!(
            "Accepted {} file target(s) and {} directory target(s)",
            targets.files.len(),
            targets.directories.len()
        );
        targets
    }
}
