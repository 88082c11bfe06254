//! # testvisor
//!
//! **Testvisor** runs test units in parallel and streams their lifecycle as
//! correlation-tagged events to isolated reporters.
//!
//! Workers pull units from a shared queue, drive each through a
//! `set_up → run → tear_down` protocol and publish what happened. Reporters
//! never run on worker tasks: each one is hosted in its own sink with its own
//! queue, so a slow, panicking or misbehaving reporter cannot stall or crash
//! the run.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   TestUnit   │   │   TestUnit   │   │   TestUnit   │
//!     │ (m.Class.t1) │   │ (m.Class.t2) │   │ (m.Other.t3) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator (run state machine)                                 │
//! │  - Dispatcher (pull queue + halt flag)                            │
//! │  - EventBus (relay loop, routes by declared event kinds)          │
//! │  - ReporterSinks (one isolated thread per reporter)               │
//! │  - OutputRelay (line-atomic reporter output)                      │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │   Worker 1   │   │   Worker 2   │   │   Worker N   │   │
//!     │ claim → run  │   │ claim → run  │   │ claim → run  │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ test_start       │ test_start       │ test_start      │
//!      │ test_success     │ test_failure     │ test_error      │ test_run_start
//!      │ test_end         │ test_end         │ test_end        │ test_run_end
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                      Bus (unbounded mpsc)                         │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                          ┌────────────────┐
//!                          │  relay loop    │
//!                          └───┬────────┬───┘
//!                    ┌─────────┼────────┼─────────┐
//!                    ▼         ▼        ▼         ▼
//!                  sink1     sink2    sink3     sinkN   (lossless queues)
//!                    ▼         ▼        ▼         ▼
//!               on_event() on_event() ...               (caught panics)
//! ```
//!
//! ### Unit lifecycle
//! ```text
//! claim() ──► resolve(unit) ──► fresh TestCase
//!   │
//!   ├─► test_start
//!   ├─► set_up   ── Skip ─► test_skip   ── Err/panic ─► test_error
//!   ├─► run      ── Ok ──► test_success ── Failure ──► test_failure
//!   │            ── Skip ─► test_skip   ── Err/panic ─► test_error
//!   ├─► tear_down (only after a successful set_up)
//!   └─► test_end
//! ```
//!
//! Every event of one execution carries the same `correlation_id`; every
//! event of the run carries the run's `run_correlation_id`.
//!
//! ## Features
//! | Area            | Description                                                   | Key types / traits                                |
//! |-----------------|---------------------------------------------------------------|---------------------------------------------------|
//! | **Cases**       | Define tests as trait impls or closures; resolve units.       | [`TestCase`], [`TestFn`], [`CaseRegistry`]        |
//! | **Events**      | Correlation-tagged lifecycle events and the relay bus.        | [`Event`], [`EventKind`], [`EventBus`]            |
//! | **Reporters**   | Isolated consumers of declared event kinds.                   | [`Reporter`], [`EventSet`], [`ReporterRegistry`]  |
//! | **Orchestration** | Worker pool, fail-fast, interrupts, bounded shutdown.       | [`Orchestrator`], [`RunSummary`]                  |
//! | **Errors**      | Typed errors per layer.                                       | [`TestError`], [`ReporterError`], [`RuntimeError`]|
//! | **Configuration** | Run settings with environment overrides.                    | [`Config`]                                        |
//!
//! ## Optional features
//! - `console` _(default)_: the built-in [`ConsoleReporter`], loaded when no
//!   reporter is configured.
//!
//! ## Example
//! ```rust
//! use testvisor::{CaseRegistry, Config, Orchestrator, TestContext, TestError, ensure_eq};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut registry = CaseRegistry::new();
//!     registry
//!         .add_fn("pkg.tests", "FastTests", "test_pass", |_ctx: TestContext| async {
//!             ensure_eq(1 + 1, 2)
//!         })
//!         .add_fn("pkg.tests", "FastTests", "test_skip", |_ctx: TestContext| async {
//!             Err::<(), _>(TestError::skip("not on this platform"))
//!         });
//!
//!     let mut cfg = Config::default();
//!     cfg.worker_count = 2;
//!     cfg.flush_window = std::time::Duration::from_millis(10);
//!
//!     let units = registry.units();
//!     let summary = Orchestrator::builder(cfg)
//!         .with_resolver(registry)
//!         .with_output(tokio::io::sink())
//!         .build()
//!         .run(units)
//!         .await;
//!
//!     assert_eq!(summary.passed, 1);
//!     assert_eq!(summary.skipped, 1);
//!     assert_eq!(summary.exit_code(), 0);
//! }
//! ```
mod cases;
mod core;
mod error;
mod events;
pub mod logging;
mod reporters;

// ---- Public re-exports ----

pub use cases::{
    BlockingFn, CaseRegistry, Lifecycle, Outcome, PublishError, Resolve, TestCase, TestContext,
    TestFn, TestUnit, ensure, ensure_eq, run_case,
};
pub use core::{
    Config, Dispatcher, ENV_CATCH_INTERRUPT, ENV_FAIL_FAST, ENV_WORKERS, Orchestrator,
    OrchestratorBuilder, OutputWriter, ReporterSpec, RunContext, RunState, RunSummary, RunTally,
    TestInvocation,
};
pub use error::{HarnessError, ReporterError, RuntimeError, TestError, TransportError};
pub use events::{Bus, CorrelationId, Event, EventBus, EventKind, Fields, RelayStats};
pub use reporters::{
    EventSet, OutputRelay, Reporter, ReporterConfig, ReporterOutput, ReporterRegistry,
    ReporterSink, SinkExit, SinkHandle,
};

// Built-in console reporter.
// Disable with: `--no-default-features`
#[cfg(feature = "console")]
pub use reporters::ConsoleReporter;
