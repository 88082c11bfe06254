//! Runtime events: data model and relay bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`CorrelationId`] event classification, payload and causality
//! - [`Bus`] non-blocking publisher handle
//! - [`EventBus`] relay loop forwarding events to reporter sinks
//!
//! ## Quick reference
//! - **Publishers**: the orchestrator (run events), workers through the
//!   event bridge (unit events), test bodies through
//!   [`TestContext::publish`](crate::TestContext::publish) (custom events).
//! - **Consumers**: reporter sinks only, each receiving the kinds it declared.
//!
//! See `core/mod.rs` for the system-level wiring diagram.

mod bus;
mod event;

pub use bus::{Bus, EventBus, RelayStats};
pub use event::{CorrelationId, Event, EventKind, Fields};
