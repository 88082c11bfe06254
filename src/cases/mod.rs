//! Test units and the execution protocol they run through.
//!
//! ## Contents
//! - [`TestUnit`] schedulable identifier (module, class, test)
//! - [`TestCase`] set-up / body / tear-down contract, with [`TestFn`] and
//!   [`BlockingFn`] adapters
//! - [`TestContext`] per-execution handle passed to every hook
//! - [`Resolve`], [`CaseRegistry`] map a unit to a fresh case instance
//! - [`run_case`], [`Lifecycle`], [`Outcome`] protocol driver and classification

mod case;
mod protocol;
mod registry;
mod unit;

pub use case::{BlockingFn, PublishError, TestCase, TestContext, TestFn, ensure, ensure_eq};
pub use protocol::{Lifecycle, Outcome, run_case};
pub use registry::{CaseRegistry, Resolve};
pub use unit::TestUnit;
