//! # Core reporter trait
//!
//! `Reporter` is the extension point for consuming test lifecycle events.
//! Each reporter is hosted by its own [`ReporterSink`](super::ReporterSink):
//! a dedicated OS thread fed by a lossless private queue, so a slow, blocking
//! or crashing reporter never affects the bus, the workers or other reporters.
//!
//! ## Contract
//! - A reporter **declares** the kinds it handles via
//!   [`Reporter::subscriptions`]; it never receives anything else.
//! - Handlers run sequentially inside the sink (`&mut self` is safe to use).
//! - Handlers may block (synchronous file I/O is fine); only their own sink waits.
//! - Handlers must ignore fields they do not know.
//! - Output goes through the [`ReporterOutput`] handle, never to stdout.
//!
//! ## Example (skeleton)
//! ```rust
//! use testvisor::{Event, EventKind, EventSet, Reporter, ReporterError, ReporterOutput};
//!
//! struct Counter(usize);
//!
//! #[async_trait::async_trait]
//! impl Reporter for Counter {
//!     fn name(&self) -> &str { "counter" }
//!     fn subscriptions(&self) -> EventSet { EventSet::of([EventKind::TestEnd]) }
//!     async fn on_event(&mut self, _ev: &Event, _out: &ReporterOutput) -> Result<(), ReporterError> {
//!         self.0 += 1;
//!         Ok(())
//!     }
//! }
//! ```

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::ReporterOutput;
use crate::error::ReporterError;
use crate::events::{Event, EventKind};

/// Contract for reporters.
#[async_trait]
pub trait Reporter: Send + 'static {
    /// Human-readable name (for logs).
    fn name(&self) -> &str;

    /// Event kinds this reporter handles. Read once when the sink starts.
    fn subscriptions(&self) -> EventSet;

    /// Called inside the sink before the first event.
    async fn on_start(&mut self, _out: &ReporterOutput) -> Result<(), ReporterError> {
        Ok(())
    }

    /// Handles one declared event.
    ///
    /// Return [`ReporterError::Unsupported`] for a declared kind without a
    /// handler, [`ReporterError::Fatal`] to end the sink.
    async fn on_event(&mut self, event: &Event, out: &ReporterOutput)
    -> Result<(), ReporterError>;

    /// Called inside the sink after the stop sentinel.
    async fn on_stop(&mut self, _out: &ReporterOutput) -> Result<(), ReporterError> {
        Ok(())
    }
}

/// Set of event kinds a reporter subscribes to.
///
/// [`EventKind::Stop`] is never part of a set; the sink handles it itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSet(BTreeSet<EventKind>);

impl EventSet {
    /// Builds a set from the given kinds.
    pub fn of(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        kinds.into_iter().collect()
    }

    /// Every kind of the standard vocabulary.
    pub fn vocabulary() -> Self {
        Self::of(EventKind::VOCABULARY)
    }

    /// Adds one kind.
    pub fn with(mut self, kind: EventKind) -> Self {
        if !kind.is_stop() {
            self.0.insert(kind);
        }
        self
    }

    /// True if `kind` was declared.
    pub fn contains(&self, kind: &EventKind) -> bool {
        self.0.contains(kind)
    }

    /// Iterates the declared kinds in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = &EventKind> {
        self.0.iter()
    }

    /// Number of declared kinds.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<EventKind> for EventSet {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        Self(iter.into_iter().filter(|k| !k.is_stop()).collect())
    }
}
