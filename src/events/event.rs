//! # Lifecycle events published by workers and the orchestrator.
//!
//! An [`Event`] is a kind, an optional [`CorrelationId`] and a mapping of
//! JSON fields. The kind vocabulary is fixed by [`EventKind`]; any other name
//! is carried as [`EventKind::Custom`] so new producers can emit events that
//! current reporters do not understand.
//!
//! ## Correlation
//! - Every execution of a test unit gets a fresh correlation id; all of its
//!   events (`test_start`, the terminal outcome, `test_end`) carry it.
//! - Run-level events (`test_run_start`, `test_run_end`,
//!   `test_run_interrupted`) carry the run correlation id.
//! - [`EventKind::Stop`] carries neither id nor fields.
//!
//! ## Ordering
//! Each event also gets a process-wide sequence number (`seq`) and a
//! timestamp. Neither is part of the wire form.
//!
//! ## Example
//! ```rust
//! use testvisor::{CorrelationId, Event, EventKind};
//!
//! let cid = CorrelationId::new();
//! let ev = Event::new(EventKind::TestFailure)
//!     .with_correlation(cid.clone())
//!     .with_field("failure", "1 != 2");
//!
//! assert_eq!(ev.kind, EventKind::TestFailure);
//! assert_eq!(ev.field_str("failure"), Some("1 != 2"));
//! assert_eq!(ev.correlation_id.as_ref(), Some(&cid));
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::cases::TestUnit;
use crate::error::HarnessError;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Field mapping carried by an event.
pub type Fields = Map<String, Value>;

/// Classification of events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    // === Run events (run correlation id) ===
    /// The orchestrator is about to dispatch units. Sets `run_id`.
    TestRunStart,
    /// All dispatched units finished. Sets `run_id`.
    TestRunEnd,
    /// An interrupt was caught; published before [`EventKind::TestRunEnd`]. Sets `run_id`.
    TestRunInterrupted,

    // === Unit events (invocation correlation id) ===
    /// A unit execution started. Sets `test_name`, `class_name`, `module_name`.
    TestStart,
    /// A unit execution finished; always after its terminal outcome.
    TestEnd,
    /// Terminal: body and hooks completed without errors.
    TestSuccess,
    /// Terminal: an assertion failed. Sets `failure`.
    TestFailure,
    /// Terminal: an unexpected error or harness failure. Sets `error`.
    TestError,
    /// Terminal: the unit was skipped. Sets `reason`.
    TestSkip,
    /// Terminal: the unit failed and was expected to. Sets `error`.
    TestExpectedFailure,
    /// Terminal: the unit passed but was expected to fail.
    TestUnexpectedSuccess,

    // === Control ===
    /// Reserved sentinel: terminate the consumer loop.
    Stop,

    /// Any other event name (custom events published by tests).
    Custom(Arc<str>),
}

impl EventKind {
    /// All named kinds of the vocabulary (excluding [`EventKind::Stop`] and customs).
    pub const VOCABULARY: [EventKind; 11] = [
        EventKind::TestRunStart,
        EventKind::TestRunEnd,
        EventKind::TestRunInterrupted,
        EventKind::TestStart,
        EventKind::TestEnd,
        EventKind::TestSuccess,
        EventKind::TestFailure,
        EventKind::TestError,
        EventKind::TestSkip,
        EventKind::TestExpectedFailure,
        EventKind::TestUnexpectedSuccess,
    ];

    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::TestRunStart => "test_run_start",
            EventKind::TestRunEnd => "test_run_end",
            EventKind::TestRunInterrupted => "test_run_interrupted",
            EventKind::TestStart => "test_start",
            EventKind::TestEnd => "test_end",
            EventKind::TestSuccess => "test_success",
            EventKind::TestFailure => "test_failure",
            EventKind::TestError => "test_error",
            EventKind::TestSkip => "test_skip",
            EventKind::TestExpectedFailure => "test_expected_failure",
            EventKind::TestUnexpectedSuccess => "test_unexpected_success",
            EventKind::Stop => "STOP",
            EventKind::Custom(name) => name,
        }
    }

    /// Builds a custom kind.
    pub fn custom(name: impl Into<Arc<str>>) -> Self {
        let name: Arc<str> = name.into();
        // Keep known names canonical so set membership works.
        match name.parse::<EventKind>() {
            Ok(EventKind::Custom(_)) | Err(_) => EventKind::Custom(name),
            Ok(known) => known,
        }
    }

    /// True for the six per-unit terminal outcomes.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::TestSuccess
                | EventKind::TestFailure
                | EventKind::TestError
                | EventKind::TestSkip
                | EventKind::TestExpectedFailure
                | EventKind::TestUnexpectedSuccess
        )
    }

    /// True for terminal outcomes that make the run fail.
    pub fn is_failing(&self) -> bool {
        matches!(self, EventKind::TestFailure | EventKind::TestError)
    }

    /// True for the reserved sentinel.
    #[inline]
    pub fn is_stop(&self) -> bool {
        matches!(self, EventKind::Stop)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = EventKind::VOCABULARY
            .iter()
            .find(|k| k.as_str() == s)
            .cloned()
            .unwrap_or_else(|| {
                if s == "STOP" {
                    EventKind::Stop
                } else {
                    EventKind::Custom(Arc::from(s))
                }
            });
        Ok(kind)
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or_else(|never| match never {}))
    }
}

/// Identifier tying together the events of one execution (or one run).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Generates a fresh random (v4 UUID) id.
    pub fn new() -> Self {
        Self(Arc::from(Uuid::new_v4().hyphenated().to_string()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

/// Correlation-tagged lifecycle event.
///
/// - `seq`: monotonic process-wide sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `fields`: JSON mapping; handlers must ignore fields they do not know
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Execution (or run) this event belongs to.
    pub correlation_id: Option<CorrelationId>,
    /// Kind-specific payload.
    pub fields: Fields,
}

/// Borrowed wire form: `{event_type, correlation_id, fields}`.
#[derive(Serialize)]
struct WireRef<'a> {
    event_type: &'a EventKind,
    correlation_id: Option<&'a CorrelationId>,
    fields: &'a Fields,
}

#[derive(Deserialize)]
struct WireOwned {
    event_type: EventKind,
    #[serde(default)]
    correlation_id: Option<CorrelationId>,
    #[serde(default)]
    fields: Fields,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            correlation_id: None,
            fields: Fields::new(),
        }
    }

    /// Creates the reserved `STOP` sentinel.
    #[inline]
    pub fn stop() -> Self {
        Event::new(EventKind::Stop)
    }

    /// Creates a run-level event carrying `run_id`.
    pub fn run(kind: EventKind, run_id: &CorrelationId) -> Self {
        Event::new(kind)
            .with_correlation(run_id.clone())
            .with_field("run_id", run_id.as_str())
    }

    /// Attaches a correlation id.
    #[inline]
    pub fn with_correlation(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Attaches a field whose value is already JSON.
    #[inline]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Attaches a field by serializing `value`.
    ///
    /// Returns [`HarnessError::Marshal`] if the value has no JSON form.
    pub fn try_with_field<T: Serialize + ?Sized>(
        mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<Self, HarnessError> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|e| HarnessError::Marshal {
            field: key.clone(),
            error: e.to_string(),
        })?;
        self.fields.insert(key, value);
        Ok(self)
    }

    /// Attaches `test_name`, `class_name` and `module_name` of a unit.
    pub fn with_unit(self, unit: &TestUnit) -> Self {
        self.with_field("test_name", unit.test_name.as_str())
            .with_field("class_name", unit.class_name.as_str())
            .with_field("module_name", unit.module_name.as_str())
    }

    /// Returns a string field, if present and a string.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// True for the reserved sentinel.
    #[inline]
    pub fn is_stop(&self) -> bool {
        self.kind.is_stop()
    }

    /// Encodes the wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&WireRef {
            event_type: &self.kind,
            correlation_id: self.correlation_id.as_ref(),
            fields: &self.fields,
        })
    }

    /// Decodes the wire form; `seq` and `at` are assigned locally.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        let wire: WireOwned = serde_json::from_str(s)?;
        let mut ev = Event::new(wire.event_type);
        ev.correlation_id = wire.correlation_id;
        ev.fields = wire.fields;
        Ok(ev)
    }
}
