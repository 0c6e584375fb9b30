//! Worker pool.
//!
//! A fixed set of worker tasks share one unbounded queue of [`Task`]s. The
//! dispatcher is the only producer. Every worker shares the same
//! [`RunContext`]: failure log, counters, reporter and join barrier.

pub mod barrier;
pub mod ports;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::catalog::{Outcome, Pair};
use crate::error::{HarnessError, HarnessResult};
use crate::failures::FailureLog;
use crate::report::Reporter;
use crate::runner::PairRunner;
use crate::stats::RunStats;

pub use barrier::JoinBarrier;
pub use ports::PortAllocator;

/// A pair and the port it runs on. Owned by exactly one worker.
#[derive(Debug)]
pub struct Task {
    /// Pair to run.
    pub pair: Pair,
    /// Port allocated at dispatch.
    pub port: u16,
}

/// State shared by every worker in a run.
pub struct RunContext {
    runner: Arc<dyn PairRunner>,
    reporter: Arc<dyn Reporter>,
    failures: Arc<FailureLog>,
    stats: RunStats,
    barrier: JoinBarrier,
}

impl RunContext {
    /// Build the context for one run. `stats` carries the run's start time.
    pub fn new(
        runner: Arc<dyn PairRunner>,
        reporter: Arc<dyn Reporter>,
        failures: FailureLog,
        stats: RunStats,
    ) -> Self {
        Self {
            runner,
            reporter,
            failures: Arc::new(failures),
            stats,
            barrier: JoinBarrier::new(),
        }
    }

    /// The run's failure log and failed count.
    pub fn failures(&self) -> &FailureLog {
        &self.failures
    }

    /// Pairs run so far and elapsed time.
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Sink for console output.
    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }
}

type SharedQueue = Arc<Mutex<mpsc::UnboundedReceiver<Task>>>;

/// Fixed-size pool of workers consuming from one queue.
pub struct WorkerPool {
    ctx: Arc<RunContext>,
    sender: Option<mpsc::UnboundedSender<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one).
    pub fn start(ctx: Arc<RunContext>, size: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue: SharedQueue = Arc::new(Mutex::new(receiver));

        let workers = (0..size.max(1))
            .map(|id| tokio::spawn(worker_loop(id, ctx.clone(), queue.clone())))
            .collect();

        Self {
            ctx,
            sender: Some(sender),
            workers,
        }
    }

    /// Number of workers running.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue `pair` to run on `port`.
    pub fn dispatch(&self, pair: Pair, port: u16) -> HarnessResult<()> {
        let sender = self.sender.as_ref().ok_or(HarnessError::QueueClosed)?;
        self.ctx.barrier.add();
        if sender.send(Task { pair, port }).is_err() {
            self.ctx.barrier.done();
            return Err(HarnessError::QueueClosed);
        }
        Ok(())
    }

    /// Block until every dispatched task is accounted for.
    pub async fn wait(&self) -> HarnessResult<()> {
        self.ctx.barrier.wait().await
    }

    /// Close the queue and join the now idle workers.
    pub async fn shutdown(mut self) -> HarnessResult<()> {
        self.sender.take();
        for result in join_all(self.workers.drain(..)).await {
            result?;
        }
        Ok(())
    }

    /// Stop every worker, including ones mid-pair.
    pub fn abort(mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            worker.abort();
        }
    }
}

async fn worker_loop(id: usize, ctx: Arc<RunContext>, queue: SharedQueue) {
    tracing::trace!(worker = id, "worker started");
    loop {
        let task = {
            let mut receiver = queue.lock().await;
            receiver.recv().await
        };
        let Some(task) = task else {
            break;
        };

        let result = AssertUnwindSafe(process(id, &ctx, task))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(HarnessError::WorkerPanic {
                    message: panic_message(payload),
                })
            });
        let fatal = result.is_err();
        if let Err(err) = result {
            tracing::error!(worker = id, error = %err, "worker failed, aborting run");
            ctx.barrier.abort(err);
        }
        ctx.barrier.done();
        if fatal {
            break;
        }
    }
    tracing::trace!(worker = id, "worker stopped");
}

async fn process(id: usize, ctx: &RunContext, task: Task) -> HarnessResult<()> {
    let Task { mut pair, port } = task;
    pair.port = Some(port);

    let mut pair = execute(ctx, pair, port).await;
    if pair.outcome == Outcome::Pending {
        pair.outcome = Outcome::HarnessFailure;
        if pair.error.is_none() {
            pair.error = Some("pair runner returned without an outcome".to_string());
        }
    }
    tracing::debug!(worker = id, pair = %pair, port, outcome = %pair.outcome, "pair finished");

    if !pair.outcome.is_success() {
        ctx.failures.clone().file(pair.clone()).await?;
    }

    ctx.reporter.pair_result(&pair);
    ctx.stats.record_run();
    Ok(())
}

/// Run the pair on its own task so a panicking runner only fails this pair.
async fn execute(ctx: &RunContext, mut pair: Pair, port: u16) -> Pair {
    let fallback = pair.clone();
    let runner = ctx.runner.clone();
    let handle = tokio::spawn(async move {
        let outcome = runner.run(&mut pair, port).await;
        pair.outcome = outcome;
        pair
    });

    match handle.await {
        Ok(pair) => pair,
        Err(err) => {
            let mut pair = fallback;
            pair.outcome = Outcome::HarnessFailure;
            pair.error = Some(if err.is_panic() {
                format!("pair runner panicked: {}", panic_message(err.into_panic()))
            } else {
                "pair runner was cancelled".to_string()
            });
            pair
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
