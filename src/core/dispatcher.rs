//! # Dispatcher: shared pull queue of units.
//!
//! Workers call [`Dispatcher::claim`] whenever they are idle, so every unit
//! is claimed by exactly one worker and slow units never block fast ones.
//! [`Dispatcher::halt`] stops dispatch (fail-fast, interrupt); units already
//! claimed keep running.
//!
//! ```text
//!   [u0 u1 u2 ... uN]  ◄── claim() ── worker 1
//!          ▲           ◄── claim() ── worker 2
//!          │           ◄── claim() ── worker N
//!        halt() ──► every later claim() returns None
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cases::TestUnit;

/// Pull-based queue shared by all workers.
#[derive(Debug)]
pub struct Dispatcher {
    queue: Mutex<VecDeque<TestUnit>>,
    halt: CancellationToken,
    claimed: AtomicUsize,
}

impl Dispatcher {
    /// Creates a dispatcher over `units`, preserving their order.
    pub fn new(units: Vec<TestUnit>) -> Self {
        Self {
            queue: Mutex::new(units.into()),
            halt: CancellationToken::new(),
            claimed: AtomicUsize::new(0),
        }
    }

    /// Takes the next unit, or `None` when the queue is empty or halted.
    pub async fn claim(&self) -> Option<TestUnit> {
        let mut queue = self.queue.lock().await;
        if self.halt.is_cancelled() {
            return None;
        }
        let unit = queue.pop_front()?;
        self.claimed.fetch_add(1, Ordering::Relaxed);
        Some(unit)
    }

    /// Stops dispatch. Idempotent.
    pub fn halt(&self) {
        if !self.halt.is_cancelled() {
            debug!(claimed = self.claimed(), "dispatch halted");
            self.halt.cancel();
        }
    }

    /// True once [`Dispatcher::halt`] was called.
    pub fn is_halted(&self) -> bool {
        self.halt.is_cancelled()
    }

    /// Units handed out so far.
    pub fn claimed(&self) -> usize {
        self.claimed.load(Ordering::Relaxed)
    }

    /// Units still waiting.
    pub async fn remaining(&self) -> usize {
        self.queue.lock().await.len()
    }
}
