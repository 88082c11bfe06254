//! # Reporters and the sinks that host them.
//!
//! ## Architecture
//! ```text
//! EventBus relay ──► SinkHandle::send ──► [queue] ──► ReporterSink thread ──► Reporter::on_event
//!                                                           │
//!                                                   ReporterOutput::line
//!                                                           ▼
//!                                                      OutputRelay ──► stdout
//! ```
//!
//! ## Contents
//! - [`Reporter`], [`EventSet`] the reporter contract and its declared kinds
//! - [`ReporterSink`], [`SinkHandle`], [`SinkExit`] isolated host thread
//! - [`ReporterOutput`], [`OutputRelay`] captured, line-atomic output
//! - [`ReporterRegistry`], [`ReporterConfig`] loading reporters by name
//! - [`ConsoleReporter`] default reporter (feature `console`)

#[cfg(feature = "console")]
mod console;
mod output;
mod registry;
mod reporter;
mod sink;

#[cfg(feature = "console")]
pub use console::ConsoleReporter;
pub use output::{OutputRelay, ReporterOutput};
pub use registry::{ReporterConfig, ReporterRegistry};
pub use reporter::{EventSet, Reporter};
pub use sink::{ReporterSink, SinkExit, SinkHandle};
