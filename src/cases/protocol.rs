//! # Execution protocol driver.
//!
//! Drives one [`TestCase`] through its lifecycle and reports every step to a
//! [`Lifecycle`] listener:
//!
//! ```text
//! start_test
//!   set_up ──► Err ─────────────────────────────┐
//!     │ Ok                                      │
//!   run  (body)                                 │
//!   tear_down (always, once set_up succeeded)   │
//!     ▼                                         ▼
//!   classify ──► add_outcome(Outcome) ◄─────────┘
//! stop_test
//! ```
//!
//! ## Classification
//! - `Ok` everywhere → [`Outcome::Success`]
//! - [`TestError::Failure`] or a panic whose message starts with
//!   `assertion` (`assert!`, `assert_eq!`, ...) → [`Outcome::Failure`]
//! - [`TestError::Error`] or any other panic → [`Outcome::Error`]
//! - [`TestError::Skip`] → [`Outcome::Skip`]
//! - with [`TestCase::expected_failure`]: failure/error →
//!   [`Outcome::ExpectedFailure`], success → [`Outcome::UnexpectedSuccess`]
//!
//! A body error takes precedence over a tear-down error; a tear-down error
//! turns an otherwise successful run into that error.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::cases::{TestCase, TestContext};
use crate::error::{TestError, panic_message};
use crate::events::EventKind;

/// Terminal classification of one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Passed.
    Success,
    /// An assertion failed.
    Failure(String),
    /// An unexpected error occurred.
    Error(String),
    /// Skipped with a reason.
    Skip(String),
    /// Failed as expected.
    ExpectedFailure(String),
    /// Passed although a failure was expected.
    UnexpectedSuccess,
}

impl Outcome {
    /// The terminal event kind for this outcome.
    pub fn kind(&self) -> EventKind {
        match self {
            Outcome::Success => EventKind::TestSuccess,
            Outcome::Failure(_) => EventKind::TestFailure,
            Outcome::Error(_) => EventKind::TestError,
            Outcome::Skip(_) => EventKind::TestSkip,
            Outcome::ExpectedFailure(_) => EventKind::TestExpectedFailure,
            Outcome::UnexpectedSuccess => EventKind::TestUnexpectedSuccess,
        }
    }

    /// The outcome-specific field (`failure`, `error` or `reason`) and its text.
    pub fn detail(&self) -> Option<(&'static str, &str)> {
        match self {
            Outcome::Failure(m) => Some(("failure", m)),
            Outcome::Error(m) | Outcome::ExpectedFailure(m) => Some(("error", m)),
            Outcome::Skip(r) => Some(("reason", r)),
            Outcome::Success | Outcome::UnexpectedSuccess => None,
        }
    }

    fn from_error(err: TestError) -> Self {
        match err {
            TestError::Failure { message } => Outcome::Failure(message),
            TestError::Error { message } => Outcome::Error(message),
            TestError::Skip { reason } => Outcome::Skip(reason),
        }
    }
}

/// Listener for lifecycle callbacks issued by [`run_case`].
///
/// Callbacks arrive in order: `start_test`, exactly one `add_outcome`, `stop_test`.
pub trait Lifecycle: Send {
    /// The test is about to run.
    fn start_test(&mut self);
    /// The test produced its terminal outcome.
    fn add_outcome(&mut self, outcome: &Outcome);
    /// The test finished.
    fn stop_test(&mut self);
}

/// Runs `case` through set-up, body and tear-down, reporting to `lifecycle`.
///
/// Returns the outcome that was reported.
pub async fn run_case(
    case: &mut dyn TestCase,
    ctx: &TestContext,
    lifecycle: &mut dyn Lifecycle,
) -> Outcome {
    lifecycle.start_test();
    let outcome = classify(case, ctx).await;
    lifecycle.add_outcome(&outcome);
    lifecycle.stop_test();
    outcome
}

async fn classify(case: &mut dyn TestCase, ctx: &TestContext) -> Outcome {
    if let Err(e) = guarded(case.set_up(ctx)).await {
        return Outcome::from_error(e);
    }
    let body = guarded(case.run(ctx)).await;
    let teardown = guarded(case.tear_down(ctx)).await;

    let result = match (body, teardown) {
        (Err(e), _) => Err(e),
        (Ok(()), res) => res,
    };

    match (result, case.expected_failure()) {
        (Ok(()), false) => Outcome::Success,
        (Ok(()), true) => Outcome::UnexpectedSuccess,
        (Err(e), _) if e.is_skip() => Outcome::from_error(e),
        (Err(e), false) => Outcome::from_error(e),
        (Err(e), true) => Outcome::ExpectedFailure(e.to_string()),
    }
}

/// Awaits a hook, converting a panic into a [`TestError`].
async fn guarded<F>(fut: F) -> Result<(), TestError>
where
    F: Future<Output = Result<(), TestError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(payload) => {
            let msg = panic_message(&*payload);
            if msg.starts_with("assertion") {
                Err(TestError::failure(msg))
            } else {
                Err(TestError::error(msg))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::TestUnit;
    use crate::core::{RunContext, TestInvocation};
    use crate::events::Bus;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Lifecycle for Recorder {
        fn start_test(&mut self) {
            self.calls.push("start".into());
        }
        fn add_outcome(&mut self, outcome: &Outcome) {
            self.calls.push(outcome.kind().to_string());
        }
        fn stop_test(&mut self) {
            self.calls.push("stop".into());
        }
    }

    struct Scripted {
        set_up: Result<(), TestError>,
        body: Result<(), TestError>,
        tear_down: Result<(), TestError>,
        panic_body: Option<&'static str>,
        expected_failure: bool,
        tore_down: bool,
    }

    impl Scripted {
        fn ok() -> Self {
            Self {
                set_up: Ok(()),
                body: Ok(()),
                tear_down: Ok(()),
                panic_body: None,
                expected_failure: false,
                tore_down: false,
            }
        }
    }

    #[async_trait]
    impl TestCase for Scripted {
        async fn set_up(&mut self, _ctx: &TestContext) -> Result<(), TestError> {
            self.set_up.clone()
        }
        async fn run(&mut self, _ctx: &TestContext) -> Result<(), TestError> {
            if let Some(msg) = self.panic_body {
                panic!("{msg}");
            }
            self.body.clone()
        }
        async fn tear_down(&mut self, _ctx: &TestContext) -> Result<(), TestError> {
            self.tore_down = true;
            self.tear_down.clone()
        }
        fn expected_failure(&self) -> bool {
            self.expected_failure
        }
    }

    fn ctx() -> TestContext {
        let (bus, _rx) = Bus::channel();
        let run = Arc::new(RunContext::new(1, false));
        let inv = TestInvocation::new(TestUnit::new("m", "C", "t"), &run);
        TestContext::new(&inv, bus, CancellationToken::new())
    }

    async fn drive(mut case: Scripted) -> (Outcome, Vec<String>, bool) {
        let mut rec = Recorder::default();
        let out = run_case(&mut case, &ctx(), &mut rec).await;
        (out, rec.calls, case.tore_down)
    }

    #[tokio::test]
    async fn success_reports_start_outcome_stop() {
        let (out, calls, tore_down) = drive(Scripted::ok()).await;
        assert_eq!(out, Outcome::Success);
        assert_eq!(calls, vec!["start", "test_success", "stop"]);
        assert!(tore_down);
    }

    #[tokio::test]
    async fn set_up_error_skips_body_and_tear_down() {
        let mut case = Scripted::ok();
        case.set_up = Err(TestError::error("db down"));
        let (out, _, tore_down) = drive(case).await;
        assert_eq!(out, Outcome::Error("db down".into()));
        assert!(!tore_down);
    }

    #[tokio::test]
    async fn assertion_panic_is_failure_other_panic_is_error() {
        let mut case = Scripted::ok();
        case.panic_body = Some("assertion `left == right` failed");
        let (out, _, tore_down) = drive(case).await;
        assert!(matches!(out, Outcome::Failure(_)));
        assert!(tore_down);

        let mut case = Scripted::ok();
        case.panic_body = Some("boom");
        let (out, _, _) = drive(case).await;
        assert_eq!(out, Outcome::Error("boom".into()));
    }

    #[tokio::test]
    async fn tear_down_error_overrides_success_only() {
        let mut case = Scripted::ok();
        case.tear_down = Err(TestError::error("leak"));
        assert_eq!(drive(case).await.0, Outcome::Error("leak".into()));

        let mut case = Scripted::ok();
        case.body = Err(TestError::failure("1 != 2"));
        case.tear_down = Err(TestError::error("leak"));
        assert_eq!(drive(case).await.0, Outcome::Failure("1 != 2".into()));
    }

    #[tokio::test]
    async fn expected_failure_classification() {
        let mut case = Scripted::ok();
        case.expected_failure = true;
        case.body = Err(TestError::failure("known bug"));
        assert_eq!(
            drive(case).await.0,
            Outcome::ExpectedFailure("known bug".into())
        );

        let mut case = Scripted::ok();
        case.expected_failure = true;
        assert_eq!(drive(case).await.0, Outcome::UnexpectedSuccess);
    }

    #[tokio::test]
    async fn skip_is_reported_with_reason() {
        let mut case = Scripted::ok();
        case.body = Err(TestError::skip("not on ci"));
        let (out, calls, _) = drive(case).await;
        assert_eq!(out.detail(), Some(("reason", "not on ci")));
        assert_eq!(calls[1], "test_skip");
    }
}
