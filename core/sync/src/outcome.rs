//! Per-file results of a run.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use sluice_common::ObjectKey;

use crate::error::SyncError;

/// Terminal result of reconciling one local file with the store.
#[derive(Debug)]
pub enum UploadOutcome {
    /// The object was written, or would have been in a dry run.
    Uploaded { dry_run: bool },
    /// The remote object already matches.
    Skipped,
    /// The file could not be reconciled.
    Failed(SyncError),
}

impl UploadOutcome {
    /// Short label for logs and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            UploadOutcome::Uploaded { dry_run: false } => "uploaded",
            UploadOutcome::Uploaded { dry_run: true } => "would upload",
            UploadOutcome::Skipped => "skipped",
            UploadOutcome::Failed(_) => "failed",
        }
    }

    /// The error of a failed outcome.
    pub fn error(&self) -> Option<&SyncError> {
        match self {
            UploadOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Outcome of one file together with where it came from and went to.
#[derive(Debug)]
pub struct FileReport {
    /// Local file.
    pub path: PathBuf,
    /// Derived object key.
    pub key: ObjectKey,
    /// What happened.
    pub outcome: UploadOutcome,
}

impl FileReport {
    pub fn is_uploaded(&self) -> bool {
        matches!(self.outcome, UploadOutcome::Uploaded { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, UploadOutcome::Skipped)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, UploadOutcome::Failed(_))
    }
}

/// Append-only collection of reports shared between workers.
#[derive(Debug, Clone, Default)]
pub struct OutcomeSink {
    reports: Arc<Mutex<Vec<FileReport>>>,
}

impl OutcomeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one report. Safe to call from several tasks at once.
    pub fn push(&self, report: FileReport) {
        // A poisoned lock only means another worker panicked mid-push
        let mut reports = match self.reports.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        reports.push(report);
    }

    pub fn len(&self) -> usize {
        self.reports.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every report recorded so far.
    pub fn drain(&self) -> Vec<FileReport> {
        let mut reports = match self.reports.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str, outcome: UploadOutcome) -> FileReport {
        FileReport {
            path: PathBuf::from(format!("/data/{}", name)),
            key: ObjectKey::new(format!("data/{}", name)),
            outcome,
        }
    }

    #[tokio::test]
    async fn test_sink_collects_from_many_tasks() {
        let sink = OutcomeSink::new();
        let mut handles = Vec::new();

        for i in 0..32 {
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                sink.push(report(&i.to_string(), UploadOutcome::Skipped));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(sink.len(), 32);
        assert_eq!(sink.drain().len(), 32);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_labels_and_predicates() {
        let uploaded = report("a", UploadOutcome::Uploaded { dry_run: false });
        let intent = report("b", UploadOutcome::Uploaded { dry_run: true });
        let failed = report(
            "c",
            UploadOutcome::Failed(SyncError::configuration("x", "y")),
        );

        assert!(uploaded.is_uploaded() && intent.is_uploaded());
        assert_eq!(intent.outcome.label(), "would upload");
        assert!(failed.is_failed());
        assert!(failed.outcome.error().is_some());
        assert!(uploaded.outcome.error().is_none());
    }
}
