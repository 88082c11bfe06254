//! # Lifecycle → event bridge.
//!
//! [`EventBridge`] is the [`Lifecycle`] listener a worker passes to
//! [`run_case`](crate::run_case). Each callback becomes one event tagged with
//! the invocation's correlation id and the unit's names:
//!
//! ```text
//! start_test           ──► test_start
//! add_outcome(Outcome) ──► test_success | test_failure{failure} | test_error{error}
//!                          | test_skip{reason} | test_expected_failure{error}
//!                          | test_unexpected_success
//! stop_test            ──► test_end
//! ```
//!
//! With fail-fast, a failing outcome halts the dispatcher **before** its event
//! is published, so no unit can be claimed after reporters see the failure.
//!
//! [`EventBridge::finish_with_error`] completes the triple for harness
//! failures, emitting whatever the driver did not.

use std::sync::Arc;

use tracing::warn;

use super::{Dispatcher, RunTally, TestInvocation};
use crate::cases::{Lifecycle, Outcome, TestUnit};
use crate::error::HarnessError;
use crate::events::{Bus, CorrelationId, Event, EventKind};

/// Publishes the lifecycle of one invocation.
pub(crate) struct EventBridge {
    correlation_id: CorrelationId,
    unit: Arc<TestUnit>,
    bus: Bus,
    tally: Arc<RunTally>,
    fail_fast: Option<Arc<Dispatcher>>,
    started: bool,
    terminal: bool,
    ended: bool,
}

impl EventBridge {
    /// `fail_fast` carries the dispatcher to halt on the first failing outcome.
    pub(crate) fn new(
        inv: &TestInvocation,
        bus: Bus,
        tally: Arc<RunTally>,
        fail_fast: Option<Arc<Dispatcher>>,
    ) -> Self {
        Self {
            correlation_id: inv.correlation_id.clone(),
            unit: Arc::clone(&inv.unit),
            bus,
            tally,
            fail_fast,
            started: false,
            terminal: false,
            ended: false,
        }
    }

    /// Reports a harness failure as `test_error`, filling in missing events.
    pub(crate) fn finish_with_error(&mut self, err: &HarnessError) {
        warn!(
            correlation_id = %self.correlation_id,
            test = %self.unit,
            label = err.as_label(),
            error = %err,
            "harness failure"
        );
        if !self.started {
            self.start_test();
        }
        if !self.terminal {
            self.add_outcome(&Outcome::Error(err.to_string()));
        }
        if !self.ended {
            self.stop_test();
        }
    }

    fn publish(&self, ev: Event) {
        self.tally.record(&ev.kind);
        let kind = ev.kind.clone();
        if let Err(e) = self.bus.publish(ev) {
            warn!(
                correlation_id = %self.correlation_id,
                kind = %kind,
                label = e.as_label(),
                "event not published"
            );
        }
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind)
            .with_correlation(self.correlation_id.clone())
            .with_unit(&self.unit)
    }
}

impl Lifecycle for EventBridge {
    fn start_test(&mut self) {
        self.started = true;
        self.publish(self.event(EventKind::TestStart));
    }

    fn add_outcome(&mut self, outcome: &Outcome) {
        let kind = outcome.kind();
        if kind.is_failing() {
            if let Some(dispatcher) = &self.fail_fast {
                dispatcher.halt();
            }
        }
        let mut ev = self.event(kind);
        if let Some((field, text)) = outcome.detail() {
            ev = ev.with_field(field, text);
        }
        self.terminal = true;
        self.publish(ev);
    }

    fn stop_test(&mut self) {
        self.ended = true;
        self.publish(self.event(EventKind::TestEnd));
    }
}
