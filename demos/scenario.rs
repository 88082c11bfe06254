//! # Demo: scenario
//!
//! Runs a small mixed suite through the orchestrator with the console reporter.
//!
//! Shows how to:
//! - Implement [`TestCase`] with fixture hooks.
//! - Register closures with [`CaseRegistry::add_fn`] / [`CaseRegistry::add_blocking`].
//! - Publish a custom event from a test body.
//! - Load [`Config`] from `TESTVISOR_*` environment variables.
//!
//! ## Flow
//! ```text
//! CaseRegistry ──► Orchestrator::run()
//!     ├─► test_run_start
//!     ├─► workers: test_start → outcome → test_end   (per unit)
//!     ├─► test_run_end
//!     └─► ConsoleReporter prints one line per event, then the tally
//! ```
//!
//! ## Run
//! ```bash
//! TESTVISOR_WORKERS=2 cargo run --example scenario
//! RUST_LOG=testvisor=debug cargo run --example scenario
//! ```

use std::time::Duration;

use async_trait::async_trait;
use testvisor::{
    CaseRegistry, Config, Orchestrator, TestCase, TestContext, TestError, TestFn, ensure,
    ensure_eq,
};

/// Case with a fixture: a buffer prepared in `set_up`, checked in `run`.
#[derive(Default)]
struct BufferTests {
    buf: Vec<u8>,
}

#[async_trait]
impl TestCase for BufferTests {
    async fn set_up(&mut self, _ctx: &TestContext) -> Result<(), TestError> {
        self.buf = b"testvisor".to_vec();
        Ok(())
    }

    async fn run(&mut self, ctx: &TestContext) -> Result<(), TestError> {
        ctx.publish_data("buffer_len", &self.buf.len())
            .map_err(|e| TestError::error(e.to_string()))?;
        ensure_eq(self.buf.len(), 9)
    }

    async fn tear_down(&mut self, _ctx: &TestContext) -> Result<(), TestError> {
        self.buf.clear();
        Ok(())
    }
}

fn suite() -> CaseRegistry {
    let mut registry = CaseRegistry::new();
    registry
        .add("demo.fixtures", "BufferTests", "test_len", BufferTests::default)
        .add_fn("demo.timing", "FastTests", "test_fast_pass", |_ctx: TestContext| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, TestError>(())
        })
        .add_fn("demo.timing", "FastTests", "test_slow_fail", |_ctx: TestContext| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            ensure_eq("left", "right")
        })
        .add_fn("demo.timing", "FastTests", "test_skipped", |_ctx: TestContext| async {
            Err::<(), _>(TestError::skip("requires a GPU"))
        })
        .add_blocking("demo.cpu", "CpuTests", "test_sum", |_ctx| {
            let sum: u64 = (1..=1_000_000u64).sum();
            ensure(sum == 500_000_500_000, "wrong sum")
        })
        .add("demo.cpu", "CpuTests", "test_known_bug", || {
            TestFn::new(|_ctx: TestContext| async { ensure_eq(0.1 + 0.2, 0.3) })
                .expecting_failure()
        });
    registry
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    testvisor::logging::init();

    let mut cfg = Config::from_env();
    cfg.catch_interrupt = true;

    let registry = suite();
    let units = registry.units();
    let summary = Orchestrator::builder(cfg)
        .with_resolver(registry)
        .build()
        .run(units)
        .await;

    for warning in &summary.warnings {
        eprintln!("warning: {warning}");
    }
    if !summary.is_success() {
        anyhow::bail!(
            "run {} failed: {} failed, {} errors{}",
            summary.run_id,
            summary.failed,
            summary.errors,
            if summary.incomplete { " (incomplete)" } else { "" }
        );
    }
    Ok(())
}
