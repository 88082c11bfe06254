//! # Worker: claims units and runs them one at a time.
//!
//! ```text
//! loop:
//!   Dispatcher::claim() ──► None ──► exit
//!        │ Some(unit)
//!        ▼
//!   TestInvocation (fresh correlation id)
//!        ▼
//!   Resolve::resolve ──► Err / panic ──► EventBridge::finish_with_error
//!        │ Ok(case)
//!        ▼
//!   run_case(case, ctx, bridge) ──► panic ──► EventBridge::finish_with_error
//! ```
//!
//! A unit never takes its worker down: every failure is turned into a
//! `test_error` for that unit and the worker claims the next one.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Dispatcher, EventBridge, RunContext, RunTally, TestInvocation};
use crate::cases::{Resolve, TestContext, TestUnit, run_case};
use crate::error::{HarnessError, panic_message};
use crate::events::Bus;

/// Everything a worker shares with its siblings.
#[derive(Clone)]
pub(crate) struct WorkerShared {
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) resolver: Arc<dyn Resolve>,
    pub(crate) run: Arc<RunContext>,
    pub(crate) bus: Bus,
    pub(crate) tally: Arc<RunTally>,
    pub(crate) cancel: CancellationToken,
}

pub(crate) struct Worker {
    id: usize,
    shared: WorkerShared,
}

impl Worker {
    pub(crate) fn new(id: usize, shared: WorkerShared) -> Self {
        Self { id, shared }
    }

    /// Runs units until dispatch ends; returns how many it executed.
    pub(crate) async fn run(self) -> usize {
        let mut executed = 0;
        while let Some(unit) = self.shared.dispatcher.claim().await {
            self.execute(unit).await;
            executed += 1;
        }
        debug!(worker = self.id, executed, "worker finished");
        executed
    }

    async fn execute(&self, unit: TestUnit) {
        let s = &self.shared;
        let inv = TestInvocation::new(unit, &s.run);
        let fail_fast = s.run.fail_fast.then(|| Arc::clone(&s.dispatcher));
        let mut bridge = EventBridge::new(&inv, s.bus.clone(), Arc::clone(&s.tally), fail_fast);
        debug!(worker = self.id, correlation_id = %inv.correlation_id, test = %inv.unit, "unit claimed");

        let resolved = std::panic::catch_unwind(AssertUnwindSafe(|| s.resolver.resolve(&inv.unit)));
        let mut case = match resolved {
            Ok(Ok(case)) => case,
            Ok(Err(e)) => return bridge.finish_with_error(&e),
            Err(p) => {
                return bridge.finish_with_error(&HarnessError::Panicked {
                    info: panic_message(&*p),
                });
            }
        };

        let ctx = TestContext::new(&inv, s.bus.clone(), s.cancel.clone());
        let driven = AssertUnwindSafe(run_case(case.as_mut(), &ctx, &mut bridge))
            .catch_unwind()
            .await;
        if let Err(p) = driven {
            bridge.finish_with_error(&HarnessError::Panicked {
                info: panic_message(&*p),
            });
        }
    }
}
