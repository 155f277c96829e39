//! Progress events emitted during a run.

use std::path::Path;
use tracing::{info, warn};

use crate::outcome::{FileReport, UploadOutcome};

/// Phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Explicit file targets.
    Files,
    /// Directory targets.
    Directories,
}

/// Receives events while the engine works.
///
/// Called from worker tasks concurrently; implementations must not block.
pub trait SyncObserver: Send + Sync {
    /// One file reached a terminal outcome.
    fn file_finished(&self, report: &FileReport);

    /// Every file under a directory target has been processed.
    fn directory_finished(&self, _directory: &Path, _files: usize) {}

    /// All targets of one kind have been processed.
    fn section_finished(&self, _section: Section) {}
}

/// Observer that writes structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn file_finished(&self, report: &FileReport) {
        let path = report.path.display();
        match &report.outcome {
            UploadOutcome::Uploaded { dry_run: true } => {
                info!(%path, key = %report.key, "Dry run: would upload")
            }
            UploadOutcome::Uploaded { dry_run: false } => {
                info!(%path, key = %report.key, "Uploaded")
            }
            UploadOutcome::Skipped => {
                info!(%path, key = %report.key, "Skipped, remote object is up to date")
            }
            UploadOutcome::Failed(err) => {
                warn!(%path, key = %report.key, error = %err, "Failed to upload")
            }
        }
    }

    fn directory_finished(&self, directory: &Path, files: usize) {
        info!(directory = %directory.display(), files, "Directory finished");
    }

    fn section_finished(&self, section: Section) {
        match section {
            Section::Files => info!("Section of uploading files finished."),
            Section::Directories => info!("Section of uploading directories finished."),
        }
    }
}
