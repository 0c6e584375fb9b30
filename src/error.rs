//! Error types for the harness.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;

/// Errors that abort a whole run.
///
/// Per-pair failures never surface here; they are classified into an
/// [`Outcome`](crate::catalog::Outcome) and recorded in the failure log.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Layered configuration could not be built.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The test definitions could not be loaded.
    #[error("Failed to load test definitions: {0}")]
    Catalog(#[from] CatalogError),

    /// The log directory could not be created.
    #[error("Failed to prepare log directory {}: {source}", path.display())]
    LogDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The failure log could not be created or written.
    #[error("Failure log error at {}: {source}", path.display())]
    FailureLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Attaching harness error text to a pair's log failed.
    #[error("Failed to write harness error context to {}: {source}", path.display())]
    ErrorContext {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Dispatch ran past the top of the port range.
    #[error("Port range exhausted after port {last}")]
    PortsExhausted { last: u16 },

    /// The task queue closed while tasks were still being dispatched.
    #[error("Task queue closed before dispatch finished")]
    QueueClosed,

    /// A worker panicked outside the pair runner, e.g. in a reporter.
    #[error("Worker panicked: {message}")]
    WorkerPanic { message: String },

    /// A worker task could not be joined.
    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;
