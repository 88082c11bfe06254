//! Run-level and per-execution identity.

use std::sync::Arc;
use std::time::Instant;

use crate::cases::TestUnit;
use crate::events::CorrelationId;

/// Facts about one orchestrator run; created once, read-only afterwards.
#[derive(Debug)]
pub struct RunContext {
    /// Correlation id shared by all run-level events.
    pub run_correlation_id: CorrelationId,
    /// Number of workers in the pool.
    pub worker_count: usize,
    /// Whether the first failure stops dispatch.
    pub fail_fast: bool,
    /// When the run started.
    pub start_time: Instant,
}

impl RunContext {
    /// Creates a context with a fresh run correlation id.
    pub fn new(worker_count: usize, fail_fast: bool) -> Self {
        Self {
            run_correlation_id: CorrelationId::new(),
            worker_count,
            fail_fast,
            start_time: Instant::now(),
        }
    }
}

/// One execution of one unit.
///
/// Built right before the unit runs; every event of the execution carries its
/// `correlation_id`. Running the same unit again yields a new id.
#[derive(Debug, Clone)]
pub struct TestInvocation {
    /// The unit being executed.
    pub unit: Arc<TestUnit>,
    /// Fresh id for this execution.
    pub correlation_id: CorrelationId,
    /// Id of the enclosing run.
    pub run_correlation_id: CorrelationId,
}

impl TestInvocation {
    /// Creates an invocation with a fresh correlation id.
    pub fn new(unit: TestUnit, run: &RunContext) -> Self {
        Self {
            unit: Arc::new(unit),
            correlation_id: CorrelationId::new(),
            run_correlation_id: run.run_correlation_id.clone(),
        }
    }
}
