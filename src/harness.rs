//! Run driver.
//!
//! Load the definitions, prepare the log directory and failure log, start
//! the worker pool, dispatch every pair on its own port, wait for all of
//! them, then report and dispose of the failure log.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::catalog::{self, Pair};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::failures::FailureLog;
use crate::pool::{PortAllocator, RunContext, WorkerPool};
use crate::report::Reporter;
use crate::runner::PairRunner;
use crate::stats::{RunStats, RunSummary};

/// Drives one harness run.
pub struct Harness {
    config: HarnessConfig,
    runner: Arc<dyn PairRunner>,
    reporter: Arc<dyn Reporter>,
}

impl Harness {
    /// Harness that runs pairs with `runner` and reports to `reporter`.
    pub fn new(
        config: HarnessConfig,
        runner: Arc<dyn PairRunner>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            config,
            runner,
            reporter,
        }
    }

    /// Configuration this harness runs with.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run every pair defined in `definitions`.
    ///
    /// Errors are fatal: nothing ran, or the failure log broke mid-run.
    /// Pair failures are reported through the returned summary.
    pub async fn run(&self, definitions: &Path) -> HarnessResult<RunSummary> {
        let stats = RunStats::new();
        let log_dir = self.config.log_dir_path();

        let pairs = catalog::load(definitions, &log_dir)?;
        tracing::info!(
            definitions = %definitions.display(),
            pairs = pairs.len(),
            "Loaded test definitions"
        );

        fs::create_dir_all(&log_dir).map_err(|source| HarnessError::LogDir {
            path: log_dir.clone(),
            source,
        })?;
        let failures = FailureLog::create(self.config.failure_log_path())?;

        self.execute(pairs, failures, stats).await
    }

    /// Dispatch `pairs` to a fresh worker pool and finalize the run.
    ///
    /// Elapsed time in the footer is measured from when `stats` was created.
    pub async fn execute(
        &self,
        pairs: Vec<Pair>,
        failures: FailureLog,
        stats: RunStats,
    ) -> HarnessResult<RunSummary> {
        let ctx = Arc::new(RunContext::new(
            self.runner.clone(),
            self.reporter.clone(),
            failures,
            stats,
        ));

        ctx.reporter().header();

        let pool = WorkerPool::start(ctx.clone(), self.config.worker_count());
        tracing::info!(
            workers = pool.size(),
            pairs = pairs.len(),
            base_port = self.config.base_port,
            "Dispatching pairs"
        );

        let mut ports = PortAllocator::new(self.config.base_port);
        for pair in pairs {
            let dispatched = ports.next_port().and_then(|port| pool.dispatch(pair, port));
            if let Err(err) = dispatched {
                pool.abort();
                return Err(err);
            }
        }

        let drained = pool.wait().await;
        if let Err(err) = drained {
            pool.abort();
            return Err(err);
        }
        pool.shutdown().await?;

        let failed = ctx.failures().failed();
        let total = ctx.stats().total_run();
        let elapsed = ctx.stats().elapsed();
        ctx.reporter().footer(failed, total, elapsed);

        let log = ctx.failures().finish(&self.config.artifact_path);
        tracing::info!(failed, total, ?log, "Run finished");

        Ok(RunSummary {
            failed,
            total,
            elapsed,
            log,
        })
    }
}
