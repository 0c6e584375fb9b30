use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::error::HarnessError;

#[derive(Debug, Default)]
struct BarrierState {
    pending: usize,
    aborted: Option<HarnessError>,
    abort_taken: bool,
}

/// Counting join barrier for dispatched tasks.
///
/// `add` is called once per dispatched task, `done` once per finished task.
/// `wait` resolves when the count returns to zero, or with the first error
/// passed to `abort`.
#[derive(Debug, Default)]
pub struct JoinBarrier {
    state: Mutex<BarrierState>,
    notify: Notify,
}

impl JoinBarrier {
    /// Barrier with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more dispatched task.
    pub fn add(&self) {
        self.lock().pending += 1;
    }

    /// Mark one task finished, waking waiters when none remain.
    pub fn done(&self) {
        let mut state = self.lock();
        state.pending = state.pending.saturating_sub(1);
        if state.pending == 0 {
            self.notify.notify_waiters();
        }
    }

    /// Fail the barrier. Only the first error is kept.
    pub fn abort(&self, err: HarnessError) {
        let mut state = self.lock();
        if state.aborted.is_none() && !state.abort_taken {
            state.aborted = Some(err);
        }
        self.notify.notify_waiters();
    }

    /// Tasks dispatched but not yet finished.
    pub fn pending(&self) -> usize {
        self.lock().pending
    }

    /// Resolve once nothing is pending, or with the abort error.
    pub async fn wait(&self) -> Result<(), HarnessError> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a wakeup between the check and
            // the await is not lost.
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(err) = state.aborted.take() {
                    state.abort_taken = true;
                    return Err(err);
                }
                if state.pending == 0 {
                    return Ok(());
                }
            }

            notified.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
