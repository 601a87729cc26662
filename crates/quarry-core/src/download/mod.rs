//! Download orchestration.
//!
//! Executes a resolved closure against a target directory: one outcome per
//! entry, processed in closure order so a partial failure still leaves the
//! primary plugin installed. One entry's failure never affects another's
//! outcome.

mod fetcher;

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::resolve::{ClosureEntry, ResolvedClosure};

pub use fetcher::{FetchFailure, FileFetcher, HttpFetcher};

/// Cooperative cancellation flag shared between the orchestrator and the
/// caller's signal handling.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Final state of one closure entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Success,
    /// A file of the same name already exists in the target directory.
    SkippedExists,
    Failed { reason: String },
}

/// Per-file result of a download run; never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    pub filename: String,
    pub status: DownloadStatus,
    pub bytes: u64,
}

impl DownloadOutcome {
    fn failed(filename: &str, reason: impl Into<String>) -> Self {
        Self {
            filename: filename.to_string(),
            status: DownloadStatus::Failed {
                reason: reason.into(),
            },
            bytes: 0,
        }
    }

    fn skipped(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            status: DownloadStatus::SkippedExists,
            bytes: 0,
        }
    }
}

/// Downloads closure entries sequentially into a target directory.
pub struct DownloadOrchestrator<'a, F> {
    fetcher: &'a F,
}

impl<'a, F: FileFetcher> DownloadOrchestrator<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self { fetcher }
    }

    /// Download every closure entry into `target_dir`, root first.
    ///
    /// Re-runs are idempotent: entries whose file already exists are
    /// skipped without re-downloading. On cancellation the in-flight entry
    /// records a failure and remaining entries are not started, so the
    /// returned outcomes may be shorter than the closure.
    pub async fn download(
        &self,
        closure: &ResolvedClosure,
        target_dir: &Path,
        cancel: &CancelToken,
    ) -> Vec<DownloadOutcome> {
        let mut outcomes = Vec::with_capacity(closure.entries.len());
        for entry in &closure.entries {
            if cancel.is_cancelled() {
                break;
            }
            outcomes.push(self.download_entry(entry, target_dir, cancel).await);
        }
        outcomes
    }

    async fn download_entry(
        &self,
        entry: &ClosureEntry,
        target_dir: &Path,
        cancel: &CancelToken,
    ) -> DownloadOutcome {
        let filename = entry.file.filename.as_str();
        if !is_safe_filename(filename) {
            return DownloadOutcome::failed(filename, "unsafe filename");
        }

        let dest = target_dir.join(filename);
        if dest.exists() {
            tracing::debug!(%filename, "already present, skipping");
            return DownloadOutcome::skipped(filename);
        }

        // Stream into a temp file in the same directory, then move it into
        // place: a crash mid-download never leaves a partial file visible
        // under its final name.
        let mut tmp = match NamedTempFile::new_in(target_dir) {
            Ok(tmp) => tmp,
            Err(err) => return DownloadOutcome::failed(filename, err.to_string()),
        };

        let bytes = match self
            .fetcher
            .fetch_to(&entry.file.url, tmp.as_file_mut(), cancel)
            .await
        {
            Ok(bytes) => bytes,
            Err(err) => return DownloadOutcome::failed(filename, err.to_string()),
        };

        // No-clobber re-check at persist time: a concurrent process may
        // have created the file while we were streaming.
        match tmp.persist_noclobber(&dest) {
            Ok(_) => {
                tracing::info!(%filename, bytes, "downloaded");
                DownloadOutcome {
                    filename: filename.to_string(),
                    status: DownloadStatus::Success,
                    bytes,
                }
            }
            Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
                DownloadOutcome::skipped(filename)
            }
            Err(err) => DownloadOutcome::failed(filename, err.to_string()),
        }
    }
}

/// Declared filenames come from remote metadata; anything that could
/// escape the target directory is rejected.
fn is_safe_filename(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/') && !name.contains('\\')
}
