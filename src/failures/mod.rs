//! Unexpected failures log.
//!
//! A single file shared by every worker. The file handle and the failure
//! counter sit behind one mutex so each record lands whole and the count
//! always matches the number of records written.

pub mod record;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::catalog::{Outcome, Pair};
use crate::error::{HarnessError, HarnessResult};

pub use record::{append_failure_record, write_harness_error_context, RECORD_MARKER};

#[derive(Debug)]
struct FailureLogState {
    file: Option<File>,
    failed: u64,
}

/// What happened to the failure log at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDisposition {
    /// No failures; the empty log was deleted.
    Removed,
    /// Failures were recorded and the log was moved here.
    Relocated(PathBuf),
    /// Relocation or removal failed; the log is still here.
    Retained(PathBuf),
}

/// Mutex-guarded append-only failure log.
#[derive(Debug)]
pub struct FailureLog {
    path: PathBuf,
    state: Mutex<FailureLogState>,
}

impl FailureLog {
    /// Create (or truncate) the log at `path`.
    pub fn create(path: impl Into<PathBuf>) -> HarnessResult<Self> {
        let path = path.into();
        let file = File::create(&path).map_err(|source| HarnessError::FailureLog {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            state: Mutex::new(FailureLogState {
                file: Some(file),
                failed: 0,
            }),
        })
    }

    /// Location of the live log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of failures recorded so far.
    pub fn failed(&self) -> u64 {
        self.lock().failed
    }

    /// Count `pair` as failed and append its record.
    pub fn record(&self, pair: &Pair) -> HarnessResult<()> {
        let mut state = self.lock();
        state.failed += 1;
        let file = state.file.as_mut().ok_or_else(|| self.error(closed()))?;
        append_failure_record(file, pair)
            .and_then(|()| file.flush())
            .map_err(|source| self.error(source))
    }

    /// File a non-successful pair on the blocking thread pool.
    ///
    /// Harness failures first get their error text appended to the client
    /// log so the record is never empty. Waiting on the log's lock and
    /// copying pair logs never stalls a runtime thread.
    pub async fn file(self: Arc<Self>, pair: Pair) -> HarnessResult<()> {
        tokio::task::spawn_blocking(move || {
            if pair.outcome == Outcome::HarnessFailure {
                let message = pair.error.clone().unwrap_or_else(|| {
                    format!(
                        "harness failure running {} on port {}",
                        pair,
                        pair.port.unwrap_or_default()
                    )
                });
                write_harness_error_context(&pair.logs.client, &message).map_err(|source| {
                    HarnessError::ErrorContext {
                        path: pair.logs.client.clone(),
                        source,
                    }
                })?;
            }
            self.record(&pair)
        })
        .await?
    }

    /// Flush and close the handle. Later records fail.
    pub fn close(&self) -> HarnessResult<()> {
        let mut state = self.lock();
        if let Some(file) = state.file.take() {
            file.sync_all().map_err(|source| self.error(source))?;
        }
        Ok(())
    }

    /// Close the log, then move it to `artifact_path` when failures were
    /// recorded or delete it otherwise. Errors are logged, not returned.
    pub fn finish(&self, artifact_path: &Path) -> LogDisposition {
        if let Err(err) = self.close() {
            tracing::warn!(error = %err, "Unable to close failure log");
        }

        if self.failed() > 0 {
            match relocate(&self.path, artifact_path) {
                Ok(()) => LogDisposition::Relocated(artifact_path.to_path_buf()),
                Err(err) => {
                    tracing::warn!(
                        from = %self.path.display(),
                        to = %artifact_path.display(),
                        error = %err,
                        "Unable to move failure log"
                    );
                    LogDisposition::Retained(self.path.clone())
                }
            }
        } else {
            match fs::remove_file(&self.path) {
                Ok(()) => LogDisposition::Removed,
                Err(err) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %err,
                        "Unable to remove empty failure log"
                    );
                    LogDisposition::Retained(self.path.clone())
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, FailureLogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn error(&self, source: io::Error) -> HarnessError {
        HarnessError::FailureLog {
            path: self.path.clone(),
            source,
        }
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "failure log is closed")
}

/// Rename, falling back to copy-and-delete across filesystems.
fn relocate(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!(error = %rename_err, "Rename failed, copying failure log instead");
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
