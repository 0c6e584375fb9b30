//! Cross-language client/server compatibility runner.
//!
//! Expands a catalog of language implementations into client/server pairs,
//! runs each pair on its own port across a bounded worker pool, and records
//! every pair that did not exit cleanly in an unexpected failures log.

pub mod catalog;
pub mod config;
pub mod error;
pub mod failures;
pub mod harness;
pub mod pool;
pub mod report;
pub mod runner;
pub mod stats;
pub mod trace;

pub use catalog::{CatalogError, Endpoint, Outcome, Pair};
pub use crate::config::HarnessConfig;
pub use error::{HarnessError, HarnessResult};
pub use failures::{FailureLog, LogDisposition};
pub use harness::Harness;
pub use report::{ConsoleReporter, Reporter};
pub use runner::{PairRunner, ProcessRunner};
pub use stats::{RunStats, RunSummary};
