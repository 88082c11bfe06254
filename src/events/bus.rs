//! # Event bus: producer handle and relay loop.
//!
//! [`Bus`] is the cheap, cloneable publisher handle over an **unbounded**
//! [`tokio::sync::mpsc`] channel, so `publish()` never blocks a worker.
//! [`EventBus`] owns the receiving side and runs the relay loop that forwards
//! every event to each reporter sink that declared its kind.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                     Sinks (declared kinds only):
//!   Orchestrator ──┐                     ┌──► [queue R1] ─► reporter R1
//!   Worker 1     ──┼──► Bus ──► relay ───┼──► [queue R2] ─► reporter R2
//!   Worker N     ──┤   (mpsc, FIFO)      └──► [queue RN] ─► reporter RN
//!   TestContext  ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: fails only with [`TransportError::Closed`] once
//!   the relay has exited.
//! - **FIFO**: a single queue, so events from one producer keep their order.
//! - **Routing**: an event goes to every sink whose subscription contains its
//!   kind; unrouted events are dropped (debug trace only).
//! - **Isolation**: a failed delivery to one sink never affects the others.
//! - **Stop**: the `STOP` sentinel ends the relay after everything queued
//!   ahead of it was forwarded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::event::Event;
use crate::error::{RuntimeError, TransportError};
use crate::reporters::SinkHandle;

/// Publisher handle for events.
///
/// Cheap to clone; every clone feeds the same relay.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: mpsc::UnboundedSender<Event>,
}

impl Bus {
    /// Creates a bus handle together with its receiving side.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueues an event without blocking.
    pub fn publish(&self, ev: Event) -> Result<(), TransportError> {
        self.tx.send(ev).map_err(|_| TransportError::Closed)
    }

    /// True once the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Counters reported by the relay loop when it exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// Events delivered to at least one sink.
    pub forwarded: u64,
    /// Events no sink declared.
    pub unrouted: u64,
}

/// Running relay: owns the receive loop and the attached sinks.
pub struct EventBus {
    bus: Bus,
    sinks: Arc<RwLock<Vec<SinkHandle>>>,
    shutdown: CancellationToken,
    join: JoinHandle<RelayStats>,
}

impl EventBus {
    /// Spawns the relay loop. Must be called inside a tokio runtime.
    pub fn start() -> Self {
        let (bus, rx) = Bus::channel();
        let sinks = Arc::new(RwLock::new(Vec::new()));
        let shutdown = CancellationToken::new();
        let join = tokio::spawn(relay(rx, Arc::clone(&sinks), shutdown.clone()));
        debug!("event bus started");
        Self {
            bus,
            sinks,
            shutdown,
            join,
        }
    }

    /// Returns a publisher handle.
    pub fn publisher(&self) -> Bus {
        self.bus.clone()
    }

    /// Routes subsequent events to `sink` as well.
    pub async fn attach(&self, sink: SinkHandle) {
        debug!(reporter = %sink.name(), "sink attached to event bus");
        self.sinks.write().await.push(sink);
    }

    /// Sends `STOP` and joins the relay within `timeout`; aborts it otherwise.
    pub async fn stop(mut self, timeout: Duration) -> Result<RelayStats, RuntimeError> {
        if self.bus.publish(Event::stop()).is_err() {
            debug!("event bus already closed before stop");
        }
        let joined = tokio::time::timeout(timeout, &mut self.join).await;
        match joined {
            Ok(Ok(stats)) => {
                debug!(
                    forwarded = stats.forwarded,
                    unrouted = stats.unrouted,
                    "event bus stopped"
                );
                Ok(stats)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "event bus relay ended abnormally");
                Ok(RelayStats::default())
            }
            Err(_) => {
                self.shutdown.cancel();
                self.join.abort();
                Err(RuntimeError::JoinTimeout {
                    component: "event_bus".into(),
                    timeout,
                })
            }
        }
    }
}

async fn relay(
    mut rx: mpsc::UnboundedReceiver<Event>,
    sinks: Arc<RwLock<Vec<SinkHandle>>>,
    shutdown: CancellationToken,
) -> RelayStats {
    let mut stats = RelayStats::default();
    loop {
        let ev = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            ev = rx.recv() => match ev {
                Some(ev) => ev,
                None => break,
            },
        };
        if ev.is_stop() {
            break;
        }

        let ev = Arc::new(ev);
        let sinks = sinks.read().await;
        let mut routed = false;
        for sink in sinks.iter().filter(|s| s.accepts(&ev.kind)) {
            routed = true;
            // Delivery failures are logged by the handle; the others still get the event.
            let _ = sink.send(Arc::clone(&ev));
        }
        if routed {
            stats.forwarded += 1;
        } else {
            stats.unrouted += 1;
            trace!(kind = %ev.kind, "event dropped: no sink declared it");
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn publish_fails_once_receiver_is_gone() {
        let (bus, rx) = Bus::channel();
        assert!(bus.publish(Event::new(EventKind::TestStart)).is_ok());
        drop(rx);
        assert!(bus.is_closed());
        assert_eq!(
            bus.publish(Event::new(EventKind::TestStart)),
            Err(TransportError::Closed)
        );
    }

    #[tokio::test]
    async fn stop_counts_unrouted_events() {
        let eb = EventBus::start();
        let bus = eb.publisher();
        bus.publish(Event::new(EventKind::TestStart)).unwrap();
        bus.publish(Event::new(EventKind::TestEnd)).unwrap();

        let stats = eb.stop(Duration::from_secs(1)).await.unwrap();
        assert_eq!(stats, RelayStats { forwarded: 0, unrouted: 2 });
        assert!(bus.publish(Event::new(EventKind::TestEnd)).is_err());
    }
}
