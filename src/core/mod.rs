//! Runtime core: orchestration and execution.
//!
//! The only entry point most callers need is [`Orchestrator`]; the other
//! public types describe a run ([`Config`], [`RunContext`], [`RunSummary`]).
//!
//! ## Wiring
//! ```text
//!                         Orchestrator
//!        ┌──────────────────┬─┴──────────────┬───────────────────┐
//!        ▼                  ▼                ▼                   ▼
//!    EventBus ◄──── publish ── WorkerPool   ReporterSinks     OutputRelay
//!    (relay)                  │ N workers     ▲  ▲               ▲
//!        │                    ▼               │  │               │
//!        │              Dispatcher.claim()    │  └─ line() ──────┘
//!        │                    ▼               │
//!        │     Resolve → run_case → EventBridge
//!        └──── forward declared kinds ────────┘
//! ```
//!
//! Internal modules:
//! - `dispatcher`: shared pull queue with a halt flag (fail-fast, interrupt);
//! - `worker`: claims units, resolves and drives them;
//! - `bridge`: turns lifecycle callbacks into correlation-tagged events;
//! - `pool`: spawns workers, joins them, enforces the interrupt grace;
//! - `tally`: lock-free counters and the [`RunSummary`];
//! - `shutdown`: cross-platform interrupt handling.

mod bridge;
mod builder;
mod config;
mod context;
mod dispatcher;
mod orchestrator;
mod pool;
mod shutdown;
mod tally;
mod worker;

pub(crate) use bridge::EventBridge;
pub use builder::OrchestratorBuilder;
pub use config::{Config, ENV_CATCH_INTERRUPT, ENV_FAIL_FAST, ENV_WORKERS, ReporterSpec};
pub use context::{RunContext, TestInvocation};
pub use dispatcher::Dispatcher;
pub use orchestrator::{Orchestrator, OutputWriter, RunState};
pub use tally::{RunSummary, RunTally};
