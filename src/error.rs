//! Error types used by the testvisor runtime, reporters and test cases.
//!
//! Errors are grouped by the boundary they belong to:
//!
//! - [`HarnessError`]: infrastructure failures while executing one unit.
//! - [`TestError`]: outcomes produced by a test body (not core errors).
//! - [`ReporterError`]: failures inside a reporter sink.
//! - [`TransportError`]: enqueue failures on a channel.
//! - [`RuntimeError`]: orchestrator-level conditions.
//!
//! None of these cross a task boundary as a panic: each is converted to an
//! event or a log line where it originates. All enums expose `as_label` for
//! stable snake_case log fields.

use std::time::Duration;
use thiserror::Error;

use crate::events::EventKind;

/// # Errors produced by the execution harness for a single unit.
///
/// Contained per unit and surfaced as a `test_error` event.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    /// No case factory is registered for the module/class pair.
    #[error("cannot resolve {module}.{class}")]
    Unresolved {
        /// Module name of the unit.
        module: String,
        /// Class name of the unit.
        class: String,
    },

    /// The class resolved but does not know the test method.
    #[error("{module}.{class} has no test named {test}")]
    UnknownTest {
        /// Module name of the unit.
        module: String,
        /// Class name of the unit.
        class: String,
        /// Test (method) name of the unit.
        test: String,
    },

    /// A field value could not be marshalled for transport.
    #[error("cannot marshal field `{field}`: {error}")]
    Marshal {
        /// Field name.
        field: String,
        /// Serializer message.
        error: String,
    },

    /// The protocol driver itself panicked.
    #[error("harness panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// A worker task ended abnormally.
    #[error("worker task failed: {info}")]
    Join {
        /// Join error rendered as text.
        info: String,
    },
}

impl HarnessError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            HarnessError::Unresolved { .. } => "harness_unresolved",
            HarnessError::UnknownTest { .. } => "harness_unknown_test",
            HarnessError::Marshal { .. } => "harness_marshal",
            HarnessError::Panicked { .. } => "harness_panicked",
            HarnessError::Join { .. } => "harness_join",
        }
    }
}

/// # Outcome errors returned by test bodies and hooks.
///
/// These are normal classifications, not failures of the runtime.
///
/// # Example
/// ```
/// use testvisor::TestError;
///
/// let err = TestError::failure("1 != 2");
/// assert_eq!(err.as_label(), "test_failure");
/// assert!(!err.is_skip());
/// ```
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TestError {
    /// An assertion did not hold.
    #[error("{message}")]
    Failure {
        /// Assertion message.
        message: String,
    },

    /// The test raised an unexpected error.
    #[error("{message}")]
    Error {
        /// Error message.
        message: String,
    },

    /// The test asked to be skipped.
    #[error("skipped: {reason}")]
    Skip {
        /// Skip reason.
        reason: String,
    },
}

impl TestError {
    /// Builds an assertion failure.
    pub fn failure(message: impl Into<String>) -> Self {
        TestError::Failure {
            message: message.into(),
        }
    }

    /// Builds an unexpected error.
    pub fn error(message: impl Into<String>) -> Self {
        TestError::Error {
            message: message.into(),
        }
    }

    /// Builds a skip request.
    pub fn skip(reason: impl Into<String>) -> Self {
        TestError::Skip {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TestError::Failure { .. } => "test_failure",
            TestError::Error { .. } => "test_error",
            TestError::Skip { .. } => "test_skip",
        }
    }

    /// Returns true for [`TestError::Skip`].
    pub fn is_skip(&self) -> bool {
        matches!(self, TestError::Skip { .. })
    }
}

impl From<HarnessError> for TestError {
    fn from(e: HarnessError) -> Self {
        TestError::error(e.to_string())
    }
}

/// # Errors raised inside a reporter.
///
/// Fully contained inside the sink hosting the reporter.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReporterError {
    /// The reporter declared the kind but has no handler for it.
    #[error("no handler for {0}")]
    Unsupported(EventKind),

    /// Handling one event failed; the sink keeps running.
    #[error("reporter failed: {0}")]
    Failed(String),

    /// The reporter cannot continue; the sink terminates.
    #[error("reporter fatal: {0}")]
    Fatal(String),
}

impl ReporterError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ReporterError::Unsupported(_) => "reporter_unsupported",
            ReporterError::Failed(_) => "reporter_failed",
            ReporterError::Fatal(_) => "reporter_fatal",
        }
    }

    /// Returns true if the sink must stop after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReporterError::Fatal(_))
    }
}

/// # Errors raised when enqueueing onto a channel.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The receiving side is gone.
    #[error("channel closed")]
    Closed,
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Closed => "transport_closed",
        }
    }
}

/// # Errors produced by the orchestrator itself.
///
/// These never abort a run; they are logged and collected into
/// [`RunSummary::warnings`](crate::RunSummary::warnings).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// In-flight units did not finish within the grace period after an interrupt.
    #[error("shutdown grace {grace:?} exceeded; {stuck} unit(s) aborted")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Number of workers that had to be aborted.
        stuck: usize,
    },

    /// A configured reporter identifier is not registered.
    #[error("unknown reporter `{0}`")]
    UnknownReporter(String),

    /// A reporter factory rejected its configuration.
    #[error("reporter `{name}` rejected its configuration: {error}")]
    ReporterConfig {
        /// Reporter identifier.
        name: String,
        /// Factory message.
        error: String,
    },

    /// The thread or runtime hosting a reporter could not be started.
    #[error("cannot start sink for reporter `{reporter}`: {error}")]
    SinkStart {
        /// Reporter name.
        reporter: String,
        /// OS error message.
        error: String,
    },

    /// A relay or sink loop did not stop within its join bound.
    #[error("{component} did not stop within {timeout:?}; abandoned")]
    JoinTimeout {
        /// Component name (`event_bus` or a reporter name).
        component: String,
        /// The bound that was exceeded.
        timeout: Duration,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use testvisor::RuntimeError;
    ///
    /// let err = RuntimeError::UnknownReporter("junit".into());
    /// assert_eq!(err.as_label(), "runtime_unknown_reporter");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::UnknownReporter(_) => "runtime_unknown_reporter",
            RuntimeError::ReporterConfig { .. } => "runtime_reporter_config",
            RuntimeError::SinkStart { .. } => "runtime_sink_start",
            RuntimeError::JoinTimeout { .. } => "runtime_join_timeout",
        }
    }
}

/// Renders a panic payload the way `std` prints it.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
