//! Sync engine that reconciles configured targets with an object store.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use sluice_common::{Error, ObjectKey, StorageClass};
use sluice_storage::ObjectStore;

use crate::config::SyncConfig;
use crate::decision::should_upload;
use crate::error::SyncError;
use crate::key::KeyDeriver;
use crate::observer::{Section, SyncObserver, TracingObserver};
use crate::outcome::{FileReport, OutcomeSink, UploadOutcome};
use crate::retry::{RetryConfig, RetryExecutor};
use crate::targets::Targets;
use crate::traversal::TraversalScheduler;

/// Result of a sync run.
#[derive(Debug)]
pub struct SyncResult {
    /// One report per file considered, files section first.
    pub reports: Vec<FileReport>,
    pub duration: Duration,
}

impl SyncResult {
    /// Files written, or that would have been written in a dry run.
    pub fn uploaded(&self) -> usize {
        self.reports.iter().filter(|r| r.is_uploaded()).count()
    }

    pub fn skipped(&self) -> usize {
        self.reports.iter().filter(|r| r.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.is_failed()).count()
    }

    /// Reports of files that failed.
    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.reports.iter().filter(|r| r.is_failed())
    }

    /// Report for a local path, if it was considered.
    pub fn report_for(&self, path: &Path) -> Option<&FileReport> {
        self.reports.iter().find(|r| r.path == path)
    }
}

/// Main engine for uploading configured files and directories.
pub struct SyncEngine<S: ObjectStore + ?Sized> {
    /// Destination of every write.
    store: Arc<S>,
    /// Run configuration.
    config: SyncConfig,
    /// Retry policy for writes.
    retry_config: RetryConfig,
    /// Receives per-file and per-directory events.
    observer: Arc<dyn SyncObserver>,
}

impl<S: ObjectStore + ?Sized + 'static> SyncEngine<S> {
    /// Create a new sync engine.
    ///
    /// Retries follow `config.max_retries`; events go to `tracing`.
    pub fn new(store: Arc<S>, config: SyncConfig) -> Self {
        let retry_config = RetryConfig::new(config.max_retries);
        Self {
            store,
            config,
            retry_config,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the event observer.
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replace the retry policy.
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run one synchronization pass over every configured target.
    ///
    /// Explicit files are processed one after another in configured order,
    /// then each directory target in turn with its files spread over the
    /// worker pool.
    ///
    /// # Errors
    /// Only `SyncError::Configuration`, raised before any target is touched.
    /// Per-file failures are reported in the result.
    pub async fn run(&self) -> Result<SyncResult, SyncError> {
        self.config.validate()?;
        let workers = self.config.worker_count()?;

        let start = Instant::now();
        info!(
            "Starting sync to {} ({} file target(s), {} directory target(s), {} worker(s){})",
            self.store.name(),
            self.config.files.len(),
            self.config.directories.len(),
            workers,
            if self.config.dry_run { ", dry run" } else { "" }
        );

        let targets = Targets::collect(&self.config).await;
        let worker = self.worker();
        let sink = OutcomeSink::new();

        if !self.config.files.is_empty() {
            for target in &targets.files {
                let report = worker.clone().process(target.path().to_path_buf()).await;
                sink.push(report);
            }
            self.observer.section_finished(Section::Files);
        }

        if !self.config.directories.is_empty() {
            let scheduler =
                TraversalScheduler::new(workers).with_skip_hidden(self.config.skip_hidden);
            for target in &targets.directories {
                let directory = target.path();
                let processed = scheduler
                    .run(
                        directory,
                        |path| worker.clone().process(path),
                        |path, reason| worker.abandoned(path, reason),
                        &sink,
                    )
                    .await;
                self.observer.directory_finished(directory, processed);
            }
            self.observer.section_finished(Section::Directories);
        }

        let result = SyncResult {
            reports: sink.drain(),
            duration: start.elapsed(),
        };
        info!(
            "Sync completed in {:?}: {} uploaded, {} skipped, {} failed",
            result.duration,
            result.uploaded(),
            result.skipped(),
            result.failed()
        );

        Ok(result)
    }

    /// Reconcile a single local file outside of a full run.
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> FileReport {
        self.worker().process(path.as_ref().to_path_buf()).await
    }

    fn worker(&self) -> FileWorker<S> {
        FileWorker {
            store: self.store.clone(),
            keys: KeyDeriver::new(self.config.omit_path_prefixes.iter().cloned()),
            storage_class: self.config.storage_class.clone(),
            dry_run: self.config.dry_run,
            retry: Arc::new(RetryExecutor::new(self.retry_config.clone())),
            observer: self.observer.clone(),
        }
    }
}

/// Per-file pipeline shared by every worker of a run.
struct FileWorker<S: ObjectStore + ?Sized> {
    store: Arc<S>,
    keys: KeyDeriver,
    storage_class: StorageClass,
    dry_run: bool,
    retry: Arc<RetryExecutor>,
    observer: Arc<dyn SyncObserver>,
}

impl<S: ObjectStore + ?Sized> Clone for FileWorker<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            keys: self.keys.clone(),
            storage_class: self.storage_class.clone(),
            dry_run: self.dry_run,
            retry: self.retry.clone(),
            observer: self.observer.clone(),
        }
    }
}

impl<S: ObjectStore + ?Sized + 'static> FileWorker<S> {
    async fn process(self, path: PathBuf) -> FileReport {
        let key = self.keys.derive(&path);
        let outcome = match self.reconcile(&path, &key).await {
            Ok(outcome) => outcome,
            Err(err) => UploadOutcome::Failed(err),
        };

        let report = FileReport { path, key, outcome };
        self.observer.file_finished(&report);
        report
    }

    /// Report for a file whose worker stopped before reaching an outcome.
    fn abandoned(&self, path: PathBuf, reason: String) -> FileReport {
        let key = self.keys.derive(&path);
        let outcome = UploadOutcome::Failed(SyncError::TransferFailed {
            key: key.clone(),
            attempts: 0,
            source: Error::Storage(format!("worker stopped: {}", reason)),
        });

        let report = FileReport { path, key, outcome };
        self.observer.file_finished(&report);
        report
    }

    async fn reconcile(&self, path: &Path, key: &ObjectKey) -> Result<UploadOutcome, SyncError> {
        if !should_upload(self.store.as_ref(), path, key).await? {
            return Ok(UploadOutcome::Skipped);
        }

        if self.dry_run {
            debug!("Dry run: Uploading {} to {}", path.display(), key);
            return Ok(UploadOutcome::Uploaded { dry_run: true });
        }

        let body = tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|source| SyncError::FileSystem {
                path: path.to_path_buf(),
                source,
            })?;

        debug!("Uploading {} ({} bytes) to {}", path.display(), body.len(), key);

        let store = self.store.clone();
        let storage_class = self.storage_class.clone();
        let key_clone = key.clone();
        self.retry
            .execute(move || {
                let store = store.clone();
                let key = key_clone.clone();
                let body = body.clone();
                let storage_class = storage_class.clone();
                async move { store.put_object(&key, body, &storage_class).await }
            })
            .await
            .map_err(|err| SyncError::TransferFailed {
                key: key.clone(),
                attempts: err.attempts,
                source: err.source,
            })?;

        Ok(UploadOutcome::Uploaded { dry_run: false })
    }
}
