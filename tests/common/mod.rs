#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use testvisor::{
    CaseRegistry, Config, CorrelationId, Event, EventKind, EventSet, Reporter, ReporterError,
    ReporterOutput, TestContext, TestError, TestUnit, ensure_eq,
};

/// Shared log of every event a [`Recording`] reporter handled, in arrival order.
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<Event>>>);

impl Log {
    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().into_iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: &EventKind) -> usize {
        self.events().iter().filter(|e| &e.kind == kind).count()
    }

    pub fn first(&self, kind: &EventKind) -> Option<Event> {
        self.events().into_iter().find(|e| &e.kind == kind)
    }

    pub fn position(&self, kind: &EventKind) -> Option<usize> {
        self.events().iter().position(|e| &e.kind == kind)
    }

    /// Event kinds per invocation correlation id, in arrival order.
    pub fn by_correlation(&self) -> HashMap<CorrelationId, Vec<EventKind>> {
        let mut out: HashMap<CorrelationId, Vec<EventKind>> = HashMap::new();
        for ev in self.events() {
            if ev.fields.contains_key("run_id") {
                continue;
            }
            if let Some(cid) = ev.correlation_id.clone() {
                out.entry(cid).or_default().push(ev.kind);
            }
        }
        out
    }
}

/// Records every declared event into a [`Log`].
pub struct Recording {
    name: String,
    subscriptions: EventSet,
    log: Log,
    per_event: Option<Duration>,
}

impl Recording {
    pub fn new(name: &str) -> (Self, Log) {
        Self::with_subscriptions(name, EventSet::vocabulary())
    }

    pub fn with_subscriptions(name: &str, subscriptions: EventSet) -> (Self, Log) {
        let log = Log::default();
        let reporter = Self {
            name: name.to_string(),
            subscriptions,
            log: log.clone(),
            per_event: None,
        };
        (reporter, log)
    }

    /// Blocks the sink thread for `per_event` on every event, like synchronous file I/O.
    pub fn slowed(mut self, per_event: Duration) -> Self {
        self.per_event = Some(per_event);
        self
    }
}

#[async_trait]
impl Reporter for Recording {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscriptions(&self) -> EventSet {
        self.subscriptions.clone()
    }

    async fn on_event(&mut self, ev: &Event, _out: &ReporterOutput) -> Result<(), ReporterError> {
        if let Some(pause) = self.per_event {
            std::thread::sleep(pause);
        }
        self.log.0.lock().unwrap().push(ev.clone());
        Ok(())
    }
}

/// Panics whenever it sees `test_start`.
pub struct PanicsOnStart;

#[async_trait]
impl Reporter for PanicsOnStart {
    fn name(&self) -> &str {
        "panics-on-start"
    }

    fn subscriptions(&self) -> EventSet {
        EventSet::of([EventKind::TestStart, EventKind::TestEnd])
    }

    async fn on_event(&mut self, ev: &Event, _out: &ReporterOutput) -> Result<(), ReporterError> {
        if ev.kind == EventKind::TestStart {
            panic!("reporter exploded on test_start");
        }
        Ok(())
    }
}

/// Config with short shutdown bounds for tests.
pub fn quick_config(workers: usize) -> Config {
    let mut cfg = Config::default();
    cfg.worker_count = workers;
    cfg.flush_window = Duration::from_millis(20);
    cfg.bus_join_timeout = Duration::from_secs(2);
    cfg.sink_join_timeout = Duration::from_secs(2);
    cfg.grace = Duration::from_millis(500);
    cfg
}

/// `n` instantly passing units of one test.
pub fn passing_units(n: usize) -> (CaseRegistry, Vec<TestUnit>) {
    let mut registry = CaseRegistry::new();
    registry.add_fn("pkg.volume", "Volume", "test_ok", |_ctx: TestContext| async {
        Ok::<_, TestError>(())
    });
    let units = (0..n)
        .map(|i| TestUnit::new("pkg.volume", "Volume", "test_ok").with_data("index", i as u64))
        .collect();
    (registry, units)
}

/// Three units: a 0.1s pass, a 0.2s equality failure and an unhandled panic.
pub fn scenario_a() -> CaseRegistry {
    let mut registry = CaseRegistry::new();
    registry
        .add_fn("pkg.tests", "ScenarioTests", "test_pass", |_ctx: TestContext| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, TestError>(())
        })
        .add_fn("pkg.tests", "ScenarioTests", "test_fail", |_ctx: TestContext| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            ensure_eq(1, 2)
        })
        .add_fn("pkg.tests", "ScenarioTests", "test_panic", |_ctx: TestContext| async {
            if true {
                panic!("unhandled boom");
            }
            Ok::<_, TestError>(())
        });
    registry
}
