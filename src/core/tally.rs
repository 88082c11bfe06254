//! # Outcome counters and the run summary.
//!
//! [`RunTally`] is shared by all workers (atomics, no locks). When the run
//! stops, the orchestrator freezes it into a [`RunSummary`] that drives the
//! exit status.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::RuntimeError;
use crate::events::{CorrelationId, EventKind};

/// Lock-free counters updated as units progress.
#[derive(Debug, Default)]
pub struct RunTally {
    started: AtomicU64,
    passed: AtomicU64,
    failed: AtomicU64,
    errors: AtomicU64,
    skipped: AtomicU64,
    expected_failures: AtomicU64,
    unexpected_successes: AtomicU64,
}

impl RunTally {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one published unit event; other kinds are ignored.
    pub fn record(&self, kind: &EventKind) {
        let counter = match kind {
            EventKind::TestStart => &self.started,
            EventKind::TestSuccess => &self.passed,
            EventKind::TestFailure => &self.failed,
            EventKind::TestError => &self.errors,
            EventKind::TestSkip => &self.skipped,
            EventKind::TestExpectedFailure => &self.expected_failures,
            EventKind::TestUnexpectedSuccess => &self.unexpected_successes,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of terminal outcomes recorded so far.
    pub fn terminals(&self) -> u64 {
        [
            &self.passed,
            &self.failed,
            &self.errors,
            &self.skipped,
            &self.expected_failures,
            &self.unexpected_successes,
        ]
        .iter()
        .map(|c| c.load(Ordering::Relaxed))
        .sum()
    }

    /// Freezes the counters into a summary.
    pub fn summarize(
        &self,
        run_id: CorrelationId,
        scheduled: usize,
        interrupted: bool,
        elapsed: Duration,
        warnings: Vec<RuntimeError>,
    ) -> RunSummary {
        let completed = self.terminals();
        RunSummary {
            run_id,
            scheduled,
            started: self.started.load(Ordering::Relaxed),
            completed,
            passed: self.passed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            expected_failures: self.expected_failures.load(Ordering::Relaxed),
            unexpected_successes: self.unexpected_successes.load(Ordering::Relaxed),
            worker_failures: 0,
            interrupted,
            incomplete: completed < scheduled as u64,
            elapsed,
            warnings,
        }
    }
}

/// Result of one orchestrator run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Run correlation id.
    pub run_id: CorrelationId,
    /// Units handed to the orchestrator.
    pub scheduled: usize,
    /// Units that published `test_start`.
    pub started: u64,
    /// Units that published a terminal outcome.
    pub completed: u64,
    /// `test_success` count.
    pub passed: u64,
    /// `test_failure` count.
    pub failed: u64,
    /// `test_error` count (harness failures included).
    pub errors: u64,
    /// `test_skip` count.
    pub skipped: u64,
    /// `test_expected_failure` count.
    pub expected_failures: u64,
    /// `test_unexpected_success` count.
    pub unexpected_successes: u64,
    /// Workers that died outside any unit.
    pub worker_failures: u64,
    /// An interrupt was caught.
    pub interrupted: bool,
    /// Fewer terminal outcomes than scheduled units (fail-fast, interrupt or abort).
    pub incomplete: bool,
    /// Wall time of the run.
    pub elapsed: Duration,
    /// Orchestrator-level problems that did not stop the run.
    pub warnings: Vec<RuntimeError>,
}

impl RunSummary {
    /// True if nothing failed, errored or was left unfinished.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors == 0 && self.worker_failures == 0 && !self.incomplete
    }

    /// Process exit status: `0` on success, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}
