//! # ReporterSink: one isolated thread per reporter.
//!
//! [`ReporterSink`] hosts a single [`Reporter`] on a dedicated OS thread that
//! drives it with its own current-thread runtime, fed by an unbounded private
//! queue. The relay talks to it only through the cloneable [`SinkHandle`],
//! which never blocks and never drops an event while the sink is alive.
//!
//! ## What it guarantees
//! - `send()` returns immediately; the queue is lossless.
//! - Per-sink FIFO (queue order).
//! - Only declared kinds are delivered (checked by [`SinkHandle::accepts`]).
//! - Errors and panics inside handlers are caught and logged; the loop goes on.
//! - A handler that blocks its thread stalls only its own sink.
//!
//! ## What ends a sink
//! - the `STOP` sentinel (normal path, `on_stop` runs);
//! - [`ReporterError::Fatal`] or a panic in `on_start` (the sink is then not alive);
//! - the join bound of [`ReporterSink::stop`] (cancelled, then abandoned).
//!
//! ## Diagram
//! ```text
//!  relay ── send(&Event) ──► [unbounded queue] ──► sink thread ─► on_event()
//!                                                      │
//!                                                      └─ catch_unwind, Unsupported → warn once
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::{EventSet, Reporter, ReporterOutput};
use crate::error::{ReporterError, RuntimeError, TransportError, panic_message};
use crate::events::{Event, EventKind};

/// Non-blocking handle used by the relay to feed one sink.
#[derive(Clone, Debug)]
pub struct SinkHandle {
    name: Arc<str>,
    subscriptions: Arc<EventSet>,
    tx: mpsc::UnboundedSender<Arc<Event>>,
}

impl SinkHandle {
    /// Reporter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kinds declared by the reporter.
    pub fn subscriptions(&self) -> &EventSet {
        &self.subscriptions
    }

    /// True if the reporter declared `kind`.
    pub fn accepts(&self, kind: &EventKind) -> bool {
        self.subscriptions.contains(kind)
    }

    /// True while the host loop is running.
    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Enqueues an event without blocking.
    ///
    /// Fails only when the sink is **gone**; the event is then dropped for
    /// this sink and a warning is logged.
    pub fn send(&self, ev: Arc<Event>) -> Result<(), TransportError> {
        self.tx.send(ev).map_err(|e| {
            warn!(reporter = %self.name, kind = %e.0.kind, "reporter dropped event: sink not alive");
            TransportError::Closed
        })
    }
}

/// How a sink's host loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkExit {
    /// Reached the stop sentinel.
    Stopped {
        /// Events handled successfully.
        handled: u64,
    },
    /// Ended early by a fatal error or a panic during start-up.
    Crashed {
        /// Events handled successfully before the crash.
        handled: u64,
        /// What ended it.
        reason: String,
    },
    /// Cancelled by [`ReporterSink::stop`] after the join bound.
    Cancelled,
}

/// A running sink hosting one reporter.
pub struct ReporterSink {
    handle: SinkHandle,
    cancel: CancellationToken,
    done: oneshot::Receiver<SinkExit>,
}

impl ReporterSink {
    /// Spawns the sink thread.
    ///
    /// Fails only if the OS refuses a new thread.
    pub fn start(reporter: Box<dyn Reporter>, output: ReporterOutput) -> Result<Self, RuntimeError> {
        let name: Arc<str> = Arc::from(reporter.name());
        let subscriptions = Arc::new(reporter.subscriptions());
        let (tx, rx) = mpsc::unbounded_channel();
        let (done_tx, done) = oneshot::channel();
        let cancel = CancellationToken::new();

        debug!(reporter = %name, kinds = subscriptions.len(), "starting reporter sink");
        let thread_name = Arc::clone(&name);
        let thread_cancel = cancel.clone();
        std::thread::Builder::new()
            .name(format!("testvisor-reporter-{name}"))
            .spawn(move || {
                let exit = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt.block_on(host(reporter, Arc::clone(&thread_name), rx, output, thread_cancel)),
                    Err(e) => crashed(&thread_name, 0, format!("cannot build sink runtime: {e}")),
                };
                let _ = done_tx.send(exit);
            })
            .map_err(|e| RuntimeError::SinkStart {
                reporter: name.to_string(),
                error: e.to_string(),
            })?;

        Ok(Self {
            handle: SinkHandle {
                name,
                subscriptions,
                tx,
            },
            cancel,
            done,
        })
    }

    /// Returns a handle for the relay.
    pub fn handle(&self) -> SinkHandle {
        self.handle.clone()
    }

    /// Reporter name.
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// True while the host loop is running.
    pub fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }

    /// Sends `STOP` and waits within `timeout`.
    ///
    /// Past the bound the sink is cancelled and its thread is left to finish
    /// on its own; the caller is never held by it.
    pub async fn stop(self, timeout: Duration) -> Result<SinkExit, RuntimeError> {
        let Self {
            handle,
            cancel,
            mut done,
        } = self;

        // A crashed sink has no receiver; `done` is then already resolved.
        let _ = handle.tx.send(Arc::new(Event::stop()));

        match tokio::time::timeout(timeout, &mut done).await {
            Ok(Ok(exit)) => Ok(exit),
            Ok(Err(_)) => {
                error!(reporter = %handle.name, "reporter sink thread ended abnormally");
                Ok(SinkExit::Crashed {
                    handled: 0,
                    reason: "sink thread ended without reporting".into(),
                })
            }
            Err(_) => {
                cancel.cancel();
                warn!(reporter = %handle.name, ?timeout, "reporter sink abandoned past join bound");
                Err(RuntimeError::JoinTimeout {
                    component: handle.name.to_string(),
                    timeout,
                })
            }
        }
    }
}

/// Polls a hook with panics caught; `None` once the sink is cancelled.
async fn guarded<F>(cancel: &CancellationToken, hook: F) -> Option<std::thread::Result<F::Output>>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        res = AssertUnwindSafe(hook).catch_unwind() => Some(res),
    }
}

/// Host loop: owns the reporter until stop, crash or cancellation.
async fn host(
    mut reporter: Box<dyn Reporter>,
    name: Arc<str>,
    mut rx: mpsc::UnboundedReceiver<Arc<Event>>,
    out: ReporterOutput,
    cancel: CancellationToken,
) -> SinkExit {
    let mut handled = 0u64;
    let mut warned: HashSet<EventKind> = HashSet::new();

    match guarded(&cancel, reporter.on_start(&out)).await {
        None => return SinkExit::Cancelled,
        Some(Ok(Ok(()))) => {}
        Some(Ok(Err(e))) if !e.is_fatal() => {
            warn!(reporter = %name, error = %e, label = e.as_label(), "reporter start hook failed");
        }
        Some(Ok(Err(e))) => return crashed(&name, handled, e.to_string()),
        Some(Err(p)) => return crashed(&name, handled, panic_message(&*p)),
    }

    loop {
        let ev = tokio::select! {
            biased;
            _ = cancel.cancelled() => return SinkExit::Cancelled,
            ev = rx.recv() => match ev {
                Some(ev) => ev,
                None => break,
            },
        };
        if ev.is_stop() {
            break;
        }

        match guarded(&cancel, reporter.on_event(&ev, &out)).await {
            None => return SinkExit::Cancelled,
            Some(Ok(Ok(()))) => handled += 1,
            Some(Ok(Err(ReporterError::Unsupported(kind)))) => {
                if warned.insert(kind.clone()) {
                    warn!(reporter = %name, kind = %kind, "reporter declared a kind it does not handle");
                }
            }
            Some(Ok(Err(e))) if e.is_fatal() => return crashed(&name, handled, e.to_string()),
            Some(Ok(Err(e))) => {
                warn!(
                    reporter = %name,
                    kind = %ev.kind,
                    correlation_id = ?ev.correlation_id.as_ref().map(|c| c.as_str()),
                    error = %e,
                    "reporter failed to handle event"
                );
            }
            Some(Err(p)) => {
                error!(
                    reporter = %name,
                    kind = %ev.kind,
                    panic = %panic_message(&*p),
                    "reporter panicked while handling event"
                );
            }
        }
    }

    match guarded(&cancel, reporter.on_stop(&out)).await {
        None => return SinkExit::Cancelled,
        Some(Ok(Ok(()))) => {}
        Some(Ok(Err(e))) => warn!(reporter = %name, error = %e, "reporter stop hook failed"),
        Some(Err(p)) => error!(reporter = %name, panic = %panic_message(&*p), "reporter panicked in stop hook"),
    }
    debug!(reporter = %name, handled, "reporter sink stopped");
    SinkExit::Stopped { handled }
}

fn crashed(name: &str, handled: u64, reason: String) -> SinkExit {
    error!(reporter = %name, reason = %reason, "reporter sink crashed");
    SinkExit::Crashed { handled, reason }
}
