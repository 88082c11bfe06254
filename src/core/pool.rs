//! # Worker pool.
//!
//! Spawns N [`Worker`]s into a [`JoinSet`] and tracks them until they exit.
//!
//! ## Rules
//! - `join_all()` is cancel-safe: it can race an interrupt inside `select!`
//!   and be resumed later without losing workers.
//! - A worker that dies (panic outside any invocation) is reported as
//!   `test_error` with the **run** correlation id; the pool keeps going.
//! - `wait_with_grace()` bounds the wait after an interrupt and aborts the
//!   stragglers.

use std::time::Duration;

use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, warn};

use super::worker::{Worker, WorkerShared};
use crate::error::{HarnessError, RuntimeError};
use crate::events::{Event, EventKind};

pub(crate) struct WorkerPool {
    set: JoinSet<usize>,
    shared: WorkerShared,
    failures: u64,
}

impl WorkerPool {
    /// Spawns `workers` workers sharing `shared`.
    pub(crate) fn spawn(workers: usize, shared: WorkerShared) -> Self {
        let mut set = JoinSet::new();
        for id in 0..workers {
            set.spawn(Worker::new(id, shared.clone()).run());
        }
        debug!(workers, "worker pool started");
        Self {
            set,
            shared,
            failures: 0,
        }
    }

    /// Waits until every worker has exited. Cancel-safe.
    pub(crate) async fn join_all(&mut self) {
        while let Some(res) = self.set.join_next().await {
            if let Err(e) = res {
                self.report_join_error(e);
            }
        }
    }

    /// Stops dispatch and cancels the tokens handed to test bodies.
    pub(crate) fn halt(&self) {
        self.shared.dispatcher.halt();
        self.shared.cancel.cancel();
    }

    /// Waits up to `grace` for in-flight units, then aborts the rest.
    pub(crate) async fn wait_with_grace(&mut self, grace: Duration) -> Result<(), RuntimeError> {
        let joined = tokio::time::timeout(grace, self.join_all()).await;
        if joined.is_ok() {
            return Ok(());
        }

        let stuck = self.set.len();
        warn!(stuck, ?grace, "grace exceeded; aborting in-flight units");
        self.set.abort_all();
        while let Some(res) = self.set.join_next().await {
            match res {
                Err(e) if e.is_cancelled() => {}
                Err(e) => self.report_join_error(e),
                Ok(_) => {}
            }
        }
        Err(RuntimeError::GraceExceeded { grace, stuck })
    }

    /// Workers that died outside an invocation.
    pub(crate) fn worker_failures(&self) -> u64 {
        self.failures
    }

    fn report_join_error(&mut self, e: JoinError) {
        let err = HarnessError::Join {
            info: e.to_string(),
        };
        error!(label = err.as_label(), error = %err, "worker task died");
        self.failures += 1;

        let ev = Event::run(EventKind::TestError, &self.shared.run.run_correlation_id)
            .with_field("error", err.to_string());
        if let Err(e) = self.shared.bus.publish(ev) {
            warn!(label = e.as_label(), "worker failure not published");
        }
    }
}
