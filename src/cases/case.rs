//! # Test case abstraction and function-backed implementations.
//!
//! A [`TestCase`] is the execution protocol a unit implements: optional
//! `set_up` / `tear_down` hooks around a `run` body. Every execution gets a
//! fresh instance, so cases may keep state in `&mut self` between hooks.
//!
//! Bodies receive a [`TestContext`] carrying the execution's correlation id,
//! the run correlation id, the unit itself, a handle for publishing custom
//! events, and a [`CancellationToken`] that is cancelled when the run is
//! interrupted.
//!
//! ## Function-backed cases
//! - [`TestFn`] wraps an async closure `Fn(TestContext) -> Fut`.
//! - [`BlockingFn`] wraps a synchronous closure and runs it on the blocking
//!   pool, so CPU-bound bodies execute in parallel.
//!
//! ```rust
//! use testvisor::{TestContext, TestError, TestFn, ensure_eq};
//!
//! let case = TestFn::new(|_ctx: TestContext| async move {
//!     ensure_eq(2 + 2, 4)?;
//!     Ok::<_, TestError>(())
//! });
//! # let _ = case;
//! ```

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::cases::TestUnit;
use crate::core::TestInvocation;
use crate::error::{HarnessError, TestError, TransportError};
use crate::events::{Bus, CorrelationId, Event, EventKind};

/// # One executable test.
///
/// The protocol driver calls `set_up`, then `run`, then `tear_down` (only if
/// `set_up` succeeded). Returning [`TestError::Skip`] from any hook skips the
/// test; [`TestError::Failure`] marks an assertion failure and
/// [`TestError::Error`] an unexpected error. Panics are caught by the driver.
#[async_trait]
pub trait TestCase: Send + 'static {
    /// Prepares the fixture.
    async fn set_up(&mut self, _ctx: &TestContext) -> Result<(), TestError> {
        Ok(())
    }

    /// Executes the test body.
    async fn run(&mut self, ctx: &TestContext) -> Result<(), TestError>;

    /// Releases the fixture.
    async fn tear_down(&mut self, _ctx: &TestContext) -> Result<(), TestError> {
        Ok(())
    }

    /// True if the body is expected to fail.
    fn expected_failure(&self) -> bool {
        false
    }
}

/// Per-execution view handed to a test case.
///
/// Cheap to clone; all members are shared handles.
#[derive(Clone, Debug)]
pub struct TestContext {
    unit: Arc<TestUnit>,
    correlation_id: CorrelationId,
    run_correlation_id: CorrelationId,
    bus: Bus,
    cancel: CancellationToken,
}

impl TestContext {
    pub(crate) fn new(inv: &TestInvocation, bus: Bus, cancel: CancellationToken) -> Self {
        Self {
            unit: Arc::clone(&inv.unit),
            correlation_id: inv.correlation_id.clone(),
            run_correlation_id: inv.run_correlation_id.clone(),
            bus,
            cancel,
        }
    }

    /// The unit being executed.
    pub fn unit(&self) -> &TestUnit {
        &self.unit
    }

    /// Correlation id of this execution.
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Correlation id of the whole run.
    pub fn run_correlation_id(&self) -> &CorrelationId {
        &self.run_correlation_id
    }

    /// Extra data attached to the unit by discovery.
    pub fn additional_data(&self) -> &Map<String, Value> {
        &self.unit.additional_data
    }

    /// Cancelled when the run is interrupted; bodies may observe it to exit early.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Publishes a custom event tagged with this execution's correlation id.
    ///
    /// The event carries `fields` plus the unit's `test_name`, `class_name`
    /// and `module_name`, which cannot be overridden. Lifecycle kinds are reserved to the runtime and are
    /// rejected as [`HarnessError::Marshal`].
    pub fn publish(
        &self,
        name: &str,
        fields: Map<String, Value>,
    ) -> Result<(), PublishError> {
        let kind = EventKind::custom(name);
        if !matches!(kind, EventKind::Custom(_)) {
            return Err(PublishError::Harness(HarnessError::Marshal {
                field: "event_type".into(),
                error: format!("`{kind}` is reserved"),
            }));
        }
        let mut ev = Event::new(kind).with_correlation(self.correlation_id.clone());
        ev.fields = fields;
        // Unit names win over caller fields of the same key.
        let ev = ev.with_unit(&self.unit);
        self.bus.publish(ev).map_err(PublishError::Transport)
    }

    /// Publishes a custom event with a single serialized `data` field.
    pub fn publish_data<T: Serialize + ?Sized>(
        &self,
        name: &str,
        data: &T,
    ) -> Result<(), PublishError> {
        let value = serde_json::to_value(data).map_err(|e| HarnessError::Marshal {
            field: "data".into(),
            error: e.to_string(),
        })?;
        let mut fields = Map::new();
        fields.insert("data".into(), value);
        self.publish(name, fields)
    }
}

/// Failure to publish a custom event from a test body.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The event could not be built.
    #[error(transparent)]
    Harness(#[from] HarnessError),
    /// The bus rejected the event.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<PublishError> for TestError {
    fn from(e: PublishError) -> Self {
        TestError::error(e.to_string())
    }
}

/// Returns a [`TestError::Failure`] unless `left == right`.
///
/// The message mirrors `assert_eq!`.
pub fn ensure_eq<T: PartialEq + Debug>(left: T, right: T) -> Result<(), TestError> {
    if left == right {
        Ok(())
    } else {
        Err(TestError::failure(format!(
            "assertion `left == right` failed\n  left: {left:?}\n right: {right:?}"
        )))
    }
}

/// Returns a [`TestError::Failure`] with `message` unless `cond` holds.
pub fn ensure(cond: bool, message: impl Into<String>) -> Result<(), TestError> {
    if cond {
        Ok(())
    } else {
        Err(TestError::failure(message))
    }
}

/// Async function-backed test case.
///
/// Wraps a closure that *creates* a new future per execution.
pub struct TestFn<F> {
    f: Arc<F>,
    expected_failure: bool,
}

impl<F> TestFn<F> {
    /// Creates a new function-backed case.
    pub fn new(f: F) -> Self {
        Self::from_arc(Arc::new(f))
    }

    /// Creates a case sharing an already-allocated closure.
    pub fn from_arc(f: Arc<F>) -> Self {
        Self {
            f,
            expected_failure: false,
        }
    }

    /// Marks the case as expected to fail.
    pub fn expecting_failure(mut self) -> Self {
        self.expected_failure = true;
        self
    }
}

#[async_trait]
impl<F, Fut> TestCase for TestFn<F>
where
    F: Fn(TestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TestError>> + Send + 'static,
{
    async fn run(&mut self, ctx: &TestContext) -> Result<(), TestError> {
        (self.f)(ctx.clone()).await
    }

    fn expected_failure(&self) -> bool {
        self.expected_failure
    }
}

/// Synchronous function-backed test case executed on the blocking pool.
pub struct BlockingFn<F> {
    f: Arc<F>,
    expected_failure: bool,
}

impl<F> BlockingFn<F> {
    /// Creates a new blocking case.
    pub fn new(f: F) -> Self {
        Self::from_arc(Arc::new(f))
    }

    /// Creates a case sharing an already-allocated closure.
    pub fn from_arc(f: Arc<F>) -> Self {
        Self {
            f,
            expected_failure: false,
        }
    }

    /// Marks the case as expected to fail.
    pub fn expecting_failure(mut self) -> Self {
        self.expected_failure = true;
        self
    }
}

#[async_trait]
impl<F> TestCase for BlockingFn<F>
where
    F: Fn(TestContext) -> Result<(), TestError> + Send + Sync + 'static,
{
    async fn run(&mut self, ctx: &TestContext) -> Result<(), TestError> {
        let f = Arc::clone(&self.f);
        let ctx = ctx.clone();
        match tokio::task::spawn_blocking(move || f(ctx)).await {
            Ok(res) => res,
            // Re-raise so the protocol driver classifies it like any other panic.
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(TestError::error(e.to_string())),
        }
    }

    fn expected_failure(&self) -> bool {
        self.expected_failure
    }
}
