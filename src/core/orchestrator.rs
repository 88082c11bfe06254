//! # Orchestrator: drives one run from bus start to bounded shutdown.
//!
//! The [`Orchestrator`] owns the event bus, the reporter sinks, the output
//! relay and the worker pool for the duration of one run.
//!
//! ## State machine
//! ```text
//! Idle ──► BusStarted ──► SinksLoaded ──► Running ──► Draining ──► Stopped
//!   │          │               │              │            │
//!   │     relay spawned   sinks attached  test_run_start  test_run_end
//!   │                     (console if     pool spawned    flush window
//!   │                      none given)                    STOP ► bus (bounded)
//!   │                                                     stop sinks (bounded)
//!   │                                                     close output relay
//! ```
//!
//! ## Interrupt path (with `catch_interrupt`)
//! ```text
//! interrupt ──► halt dispatch + cancel test tokens
//!           ──► wait in-flight units up to `grace` (abort the rest)
//!           ──► test_run_interrupted ──► normal Draining / Stopped
//! ```
//!
//! Every wait is bounded; nothing here returns an error. Problems become log
//! lines and [`RunSummary::warnings`].
//!
//! ## Example
//! ```rust
//! use testvisor::{CaseRegistry, Config, Orchestrator, TestError, ensure_eq};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut registry = CaseRegistry::new();
//!     registry.add_fn("pkg.tests", "MathTests", "test_add", |_ctx| async {
//!         ensure_eq(2 + 2, 4)?;
//!         Ok::<_, TestError>(())
//!     });
//!     let units = registry.units();
//!
//!     let mut cfg = Config::default();
//!     cfg.worker_count = 2;
//!     cfg.flush_window = std::time::Duration::from_millis(10);
//!
//!     let summary = Orchestrator::builder(cfg)
//!         .with_resolver(registry)
//!         .build()
//!         .run(units)
//!         .await;
//!     assert_eq!(summary.exit_code(), 0);
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::pool::WorkerPool;
use super::worker::WorkerShared;
use super::{Config, Dispatcher, OrchestratorBuilder, RunContext, RunSummary, RunTally, shutdown};
use crate::cases::{Resolve, TestUnit};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventBus, EventKind};
use crate::reporters::{OutputRelay, Reporter, ReporterConfig, ReporterRegistry, ReporterSink};

/// Boxed writer receiving reporter output.
pub type OutputWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Nothing started.
    Idle,
    /// Relay loop running.
    BusStarted,
    /// Reporter sinks attached to the bus.
    SinksLoaded,
    /// Units being dispatched.
    Running,
    /// All units finished; shutting down.
    Draining,
    /// Bus, sinks and output relay stopped.
    Stopped,
}

impl RunState {
    /// Stable snake_case name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::BusStarted => "bus_started",
            RunState::SinksLoaded => "sinks_loaded",
            RunState::Running => "running",
            RunState::Draining => "draining",
            RunState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level driver of a test run.
pub struct Orchestrator {
    cfg: Config,
    resolver: Arc<dyn Resolve>,
    reporters: Vec<Box<dyn Reporter>>,
    registry: ReporterRegistry,
    output: OutputWriter,
    state: RunState,
}

impl Orchestrator {
    /// Starts building an orchestrator.
    pub fn builder(cfg: Config) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cfg)
    }

    pub(crate) fn from_parts(
        cfg: Config,
        resolver: Arc<dyn Resolve>,
        reporters: Vec<Box<dyn Reporter>>,
        registry: ReporterRegistry,
        output: OutputWriter,
    ) -> Self {
        Self {
            cfg,
            resolver,
            reporters,
            registry,
            output,
            state: RunState::Idle,
        }
    }

    /// Current state (always [`RunState::Idle`] before `run`).
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Runs `units` to completion.
    ///
    /// With [`Config::catch_interrupt`], SIGINT/SIGTERM/Ctrl-C trigger the
    /// graceful interrupt path.
    pub async fn run(self, units: Vec<TestUnit>) -> RunSummary {
        if self.cfg.catch_interrupt {
            self.run_until(units, interrupt_signal()).await
        } else {
            self.run_until(units, std::future::pending()).await
        }
    }

    /// Runs `units`, treating completion of `interrupt` as an interrupt.
    pub async fn run_until<F>(mut self, units: Vec<TestUnit>, interrupt: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let mut warnings = Vec::new();
        let scheduled = units.len();
        let run = Arc::new(RunContext::new(self.cfg.effective_workers(), self.cfg.fail_fast));
        let run_id = run.run_correlation_id.clone();
        info!(run_id = %run_id, units = scheduled, workers = run.worker_count, fail_fast = run.fail_fast, "test run starting");

        // Idle → BusStarted
        let bus = EventBus::start();
        let publisher = bus.publisher();
        let output = std::mem::replace(&mut self.output, Box::new(tokio::io::sink()));
        let relay = OutputRelay::spawn(output);
        self.transition(RunState::BusStarted);

        // BusStarted → SinksLoaded
        let sinks = self.load_sinks(&bus, &relay, &mut warnings).await;
        self.transition(RunState::SinksLoaded);

        // SinksLoaded → Running
        publish(&publisher, Event::run(EventKind::TestRunStart, &run_id));
        let tally = Arc::new(RunTally::new());
        let shared = WorkerShared {
            dispatcher: Arc::new(Dispatcher::new(units)),
            resolver: Arc::clone(&self.resolver),
            run: Arc::clone(&run),
            bus: publisher.clone(),
            tally: Arc::clone(&tally),
            cancel: CancellationToken::new(),
        };
        let mut pool = WorkerPool::spawn(run.worker_count.min(scheduled), shared);
        self.transition(RunState::Running);

        let interrupted = tokio::select! {
            _ = pool.join_all() => false,
            _ = interrupt => true,
        };
        if interrupted {
            warn!(run_id = %run_id, "interrupt received; stopping dispatch");
            pool.halt();
            if let Err(e) = pool.wait_with_grace(self.cfg.grace).await {
                warnings.push(e);
            }
            publish(&publisher, Event::run(EventKind::TestRunInterrupted, &run_id));
        }

        // Running → Draining
        self.transition(RunState::Draining);
        publish(&publisher, Event::run(EventKind::TestRunEnd, &run_id));

        // Draining → Stopped
        tokio::time::sleep(self.cfg.flush_window).await;
        if let Err(e) = bus.stop(self.cfg.bus_join_timeout).await {
            warn!(label = e.as_label(), error = %e, "event bus join bound exceeded");
            warnings.push(e);
        }
        self.stop_sinks(sinks, &mut warnings).await;
        match tokio::time::timeout(self.cfg.sink_join_timeout, relay.finish()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "reporter output relay failed"),
            Err(_) => {
                let e = RuntimeError::JoinTimeout {
                    component: "output_relay".into(),
                    timeout: self.cfg.sink_join_timeout,
                };
                warn!(label = e.as_label(), error = %e, "output relay join bound exceeded");
                warnings.push(e);
            }
        }
        self.transition(RunState::Stopped);

        let mut summary =
            tally.summarize(run_id, scheduled, interrupted, run.start_time.elapsed(), warnings);
        summary.worker_failures = pool.worker_failures();
        info!(
            run_id = %summary.run_id,
            passed = summary.passed,
            failed = summary.failed,
            errors = summary.errors,
            skipped = summary.skipped,
            incomplete = summary.incomplete,
            elapsed = ?summary.elapsed,
            "test run finished"
        );
        summary
    }

    /// Starts one sink per reporter and attaches it to the bus.
    async fn load_sinks(
        &mut self,
        bus: &EventBus,
        relay: &OutputRelay<OutputWriter>,
        warnings: &mut Vec<RuntimeError>,
    ) -> Vec<ReporterSink> {
        let mut reporters = std::mem::take(&mut self.reporters);
        let specs = std::mem::take(&mut self.cfg.reporters);
        let use_default = reporters.is_empty() && specs.is_empty();

        for spec in &specs {
            match self.registry.load(&spec.name, &spec.config) {
                Ok(r) => reporters.push(r),
                Err(e) => {
                    warn!(reporter = %spec.name, label = e.as_label(), error = %e, "failed to load reporter");
                    warnings.push(e);
                }
            }
        }
        if use_default {
            match self.registry.load("DefaultReporter", &ReporterConfig::new()) {
                Ok(r) => reporters.push(r),
                Err(e) => debug!(error = %e, "no default reporter available"),
            }
        }

        let mut sinks = Vec::with_capacity(reporters.len());
        for reporter in reporters {
            let output = relay.handle(reporter.name());
            match ReporterSink::start(reporter, output) {
                Ok(sink) => {
                    bus.attach(sink.handle()).await;
                    sinks.push(sink);
                }
                Err(e) => {
                    warn!(label = e.as_label(), error = %e, "failed to start reporter sink");
                    warnings.push(e);
                }
            }
        }
        sinks
    }

    /// Stops all sinks concurrently, each within the sink join bound.
    async fn stop_sinks(&self, sinks: Vec<ReporterSink>, warnings: &mut Vec<RuntimeError>) {
        let timeout = self.cfg.sink_join_timeout;
        let names: Vec<String> = sinks.iter().map(|s| s.name().to_string()).collect();
        let results = futures::future::join_all(sinks.into_iter().map(|s| s.stop(timeout))).await;
        for (name, res) in names.into_iter().zip(results) {
            match res {
                Ok(exit) => debug!(reporter = %name, ?exit, "reporter sink joined"),
                Err(e) => {
                    warn!(reporter = %name, label = e.as_label(), error = %e, "reporter sink abandoned");
                    warnings.push(e);
                }
            }
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "run state");
        self.state = next;
    }
}

fn publish(bus: &Bus, ev: Event) {
    let kind = ev.kind.clone();
    if let Err(e) = bus.publish(ev) {
        warn!(kind = %kind, label = e.as_label(), "run event not published");
    }
}

/// Completes on an OS interrupt; never completes if handlers cannot be installed.
async fn interrupt_signal() {
    if let Err(e) = shutdown::wait_for_interrupt().await {
        warn!(error = %e, "cannot install interrupt handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_render_snake_case() {
        assert_eq!(RunState::SinksLoaded.to_string(), "sinks_loaded");
        assert_eq!(RunState::BusStarted.as_str(), "bus_started");
    }

    #[tokio::test]
    async fn fresh_orchestrator_is_idle() {
        let orch = Orchestrator::builder(Config::default()).build();
        assert_eq!(orch.state(), RunState::Idle);
    }
}
