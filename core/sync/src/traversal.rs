//! Directory enumeration and bounded-parallel dispatch.

use futures::future::join_all;
use std::future::Future;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::outcome::{FileReport, OutcomeSink};

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map_or(false, |name| name.starts_with('.'))
}

/// List every regular file below `root`, recursively.
///
/// Symbolic links are not followed into directories; a link that resolves to
/// a regular file is listed. Entries that cannot be read are logged and
/// skipped. With `skip_hidden`, dot files are left out and dot directories
/// are not entered, the way shell globs treat them; otherwise they are
/// listed like any other entry.
pub async fn enumerate(root: &Path, skip_hidden: bool) -> Vec<PathBuf> {
    let root = root.to_path_buf();
    let walk = tokio::task::spawn_blocking(move || {
        WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !(skip_hidden && is_hidden(entry)))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    None
                }
            })
            .filter(|entry| {
                let file_type = entry.file_type();
                file_type.is_file()
                    || (file_type.is_symlink()
                        && std::fs::metadata(entry.path())
                            .map(|m| m.is_file())
                            .unwrap_or(false))
            })
            .map(|entry| entry.into_path())
            .collect::<Vec<_>>()
    })
    .await;

    match walk {
        Ok(files) => files,
        Err(e) => {
            warn!("Directory walk did not complete: {}", e);
            Vec::new()
        }
    }
}

/// Runs a per-file operation over directory trees with a fixed number of
/// concurrent workers.
#[derive(Debug, Clone)]
pub struct TraversalScheduler {
    workers: NonZeroUsize,
    skip_hidden: bool,
}

impl TraversalScheduler {
    pub fn new(workers: NonZeroUsize) -> Self {
        Self {
            workers,
            skip_hidden: false,
        }
    }

    /// Leave dot files and dot directories out of the walk.
    pub fn with_skip_hidden(mut self, skip_hidden: bool) -> Self {
        self.skip_hidden = skip_hidden;
        self
    }

    /// Maximum number of files in flight.
    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    /// Process every regular file under `root`, at most `workers` at a time.
    ///
    /// Returns once every file has a report in `sink`. The return value is the
    /// number of files reported.
    pub async fn run<F, Fut, A>(
        &self,
        root: &Path,
        process: F,
        abandon: A,
        sink: &OutcomeSink,
    ) -> usize
    where
        F: Fn(PathBuf) -> Fut,
        Fut: Future<Output = FileReport> + Send + 'static,
        A: Fn(PathBuf, String) -> FileReport,
    {
        let files = enumerate(root, self.skip_hidden).await;
        debug!(
            "Found {} file(s) under {}, using {} worker(s)",
            files.len(),
            root.display(),
            self.workers
        );

        self.dispatch(files, process, abandon, sink).await
    }

    /// Process `files` with bounded parallelism and wait for all of them.
    ///
    /// A worker that dies before producing its report is replaced by
    /// `abandon(path, reason)`, so every file ends up with exactly one report.
    pub async fn dispatch<F, Fut, A>(
        &self,
        files: Vec<PathBuf>,
        process: F,
        abandon: A,
        sink: &OutcomeSink,
    ) -> usize
    where
        F: Fn(PathBuf) -> Fut,
        Fut: Future<Output = FileReport> + Send + 'static,
        A: Fn(PathBuf, String) -> FileReport,
    {
        let semaphore = Arc::new(Semaphore::new(self.workers.get()));
        let mut paths = Vec::with_capacity(files.len());
        let mut handles = Vec::with_capacity(files.len());
        let mut pending = files.into_iter();
        let mut reported = 0;

        for path in pending.by_ref() {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    warn!("Worker pool closed: {}", e);
                    sink.push(abandon(path, e.to_string()));
                    reported += 1;
                    break;
                }
            };
            let task = process(path.clone());
            let sink = sink.clone();

            let handle = tokio::spawn(async move {
                let report = task.await;
                sink.push(report);
                drop(permit);
            });
            paths.push(path);
            handles.push(handle);
        }

        for (path, joined) in paths.into_iter().zip(join_all(handles).await) {
            if let Err(e) = joined {
                warn!("Worker for {} did not finish: {}", path.display(), e);
                sink.push(abandon(path, e.to_string()));
            }
            reported += 1;
        }
        for path in pending {
            sink.push(abandon(path, "worker pool closed".to_string()));
            reported += 1;
        }
        reported
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::outcome::UploadOutcome;
    use sluice_common::ObjectKey;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn skipped(path: PathBuf) -> FileReport {
        FileReport {
            key: ObjectKey::new(path.to_string_lossy().into_owned()),
            path,
            outcome: UploadOutcome::Skipped,
        }
    }

    fn abandoned(path: PathBuf, reason: String) -> FileReport {
        FileReport {
            key: ObjectKey::new(path.to_string_lossy().into_owned()),
            path,
            outcome: UploadOutcome::Failed(SyncError::configuration("worker", reason)),
        }
    }

    fn workers(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_enumerate_recurses_and_includes_hidden() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("a/b")).unwrap();
        std::fs::create_dir(temp.path().join("empty")).unwrap();
        std::fs::write(temp.path().join("top.txt"), b"1").unwrap();
        std::fs::write(temp.path().join(".hidden"), b"2").unwrap();
        std::fs::write(temp.path().join("a/b/deep.txt"), b"3").unwrap();

        let mut files = enumerate(temp.path(), false).await;
        files.sort();

        let mut expected = vec![
            temp.path().join(".hidden"),
            temp.path().join("a/b/deep.txt"),
            temp.path().join("top.txt"),
        ];
        expected.sort();
        assert_eq!(files, expected);
    }

    #[tokio::test]
    async fn test_enumerate_empty_and_missing() {
        let temp = TempDir::new().unwrap();
        assert!(enumerate(temp.path(), false).await.is_empty());
        assert!(enumerate(&temp.path().join("missing"), false).await.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_enumerate_symlinks() {
        let temp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("inner.txt"), b"x").unwrap();
        std::fs::write(temp.path().join("real.txt"), b"x").unwrap();
        std::os::unix::fs::symlink(temp.path().join("real.txt"), temp.path().join("link.txt"))
            .unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("linked_dir")).unwrap();

        let mut files = enumerate(temp.path(), false).await;
        files.sort();

        assert_eq!(
            files,
            vec![temp.path().join("link.txt"), temp.path().join("real.txt")]
        );
    }

    #[tokio::test]
    async fn test_run_reports_every_file() {
        let temp = TempDir::new().unwrap();
        for i in 0..20 {
            std::fs::write(temp.path().join(format!("f{}", i)), b"x").unwrap();
        }

        let sink = OutcomeSink::new();
        let scheduler = TraversalScheduler::new(workers(4));
        let processed = scheduler
            .run(temp.path(), |path| async move { skipped(path) }, abandoned, &sink)
            .await;

        assert_eq!(processed, 20);
        assert_eq!(sink.len(), 20);
    }

    #[tokio::test]
    async fn test_dispatch_respects_worker_bound() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let files: Vec<PathBuf> = (0..16).map(|i| PathBuf::from(format!("/f{}", i))).collect();

        let sink = OutcomeSink::new();
        let scheduler = TraversalScheduler::new(workers(3));
        let processed = scheduler
            .dispatch(
                files,
                |path| {
                    let in_flight = in_flight.clone();
                    let peak = peak.clone();
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        skipped(path)
                    }
                },
                abandoned,
                &sink,
            )
            .await;

        assert_eq!(processed, 16);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_single_worker_is_sequential() {
        let files: Vec<PathBuf> = (0..5).map(|i| PathBuf::from(format!("/f{}", i))).collect();
        let sink = OutcomeSink::new();

        TraversalScheduler::new(workers(1))
            .dispatch(files.clone(), |path| async move { skipped(path) }, abandoned, &sink)
            .await;

        let order: Vec<PathBuf> = sink.drain().into_iter().map(|r| r.path).collect();
        assert_eq!(order, files);
    }

    #[tokio::test]
    async fn test_enumerate_can_skip_hidden_entries() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".git/objects")).unwrap();
        std::fs::write(temp.path().join(".git/objects/pack"), b"p").unwrap();
        std::fs::write(temp.path().join(".env"), b"e").unwrap();
        std::fs::write(temp.path().join("index.html"), b"i").unwrap();

        let visible = enumerate(temp.path(), true).await;
        assert_eq!(visible, vec![temp.path().join("index.html")]);

        assert_eq!(enumerate(temp.path(), false).await.len(), 3);
    }

    #[tokio::test]
    async fn test_hidden_root_is_still_walked() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join(".config");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("settings.json"), b"{}").unwrap();

        assert_eq!(enumerate(&root, true).await, vec![root.join("settings.json")]);
    }

    #[tokio::test]
    async fn test_panicking_worker_still_gets_a_report() {
        let files: Vec<PathBuf> = (0..6).map(|i| PathBuf::from(format!("/f{}", i))).collect();
        let sink = OutcomeSink::new();

        let reported = TraversalScheduler::new(workers(2))
            .dispatch(
                files,
                |path| async move {
                    if path.as_path() == Path::new("/f3") {
                        panic!("worker blew up");
                    }
                    skipped(path)
                },
                abandoned,
                &sink,
            )
            .await;

        assert_eq!(reported, 6);
        let reports = sink.drain();
        assert_eq!(reports.len(), 6);
        let failed: Vec<_> = reports.iter().filter(|r| r.is_failed()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].path, PathBuf::from("/f3"));
    }
}
