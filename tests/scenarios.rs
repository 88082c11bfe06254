mod common;

use std::collections::HashSet;
use std::time::Duration;

use common::{PanicsOnStart, Recording, passing_units, quick_config, scenario_a};
use serde_json::Map;
use testvisor::{
    CaseRegistry, EventKind, EventSet, Orchestrator, ReporterSpec, RuntimeError, TestContext,
    TestError,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mixed_outcomes_are_all_reported() {
    let registry = scenario_a();
    let units = registry.units();
    let (recorder, log) = Recording::new("recorder");

    let summary = Orchestrator::builder(quick_config(2))
        .with_resolver(registry)
        .with_reporter(recorder)
        .with_output(tokio::io::sink())
        .build()
        .run(units)
        .await;

    assert_eq!(log.count(&EventKind::TestStart), 3);
    assert_eq!(log.count(&EventKind::TestEnd), 3);
    assert_eq!(log.count(&EventKind::TestSuccess), 1);
    assert_eq!(log.count(&EventKind::TestFailure), 1);
    assert_eq!(log.count(&EventKind::TestError), 1);

    let failure = log.first(&EventKind::TestFailure).unwrap();
    assert_eq!(failure.field_str("test_name"), Some("test_fail"));
    assert!(failure.field_str("failure").unwrap().contains("right: 2"));
    let error = log.first(&EventKind::TestError).unwrap();
    assert_eq!(error.field_str("test_name"), Some("test_panic"));
    assert!(error.field_str("error").unwrap().contains("unhandled boom"));

    let kinds = log.kinds();
    assert_eq!(kinds.first(), Some(&EventKind::TestRunStart));
    assert_eq!(kinds.last(), Some(&EventKind::TestRunEnd));

    assert_eq!(summary.scheduled, 3);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors, 1);
    assert!(!summary.incomplete);
    assert_eq!(summary.exit_code(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn every_execution_is_start_terminal_end() {
    let registry = scenario_a();
    let units = registry.units();
    let (recorder, log) = Recording::new("recorder");

    Orchestrator::builder(quick_config(2))
        .with_resolver(registry)
        .with_reporter(recorder)
        .with_output(tokio::io::sink())
        .build()
        .run(units)
        .await;

    let by_cid = log.by_correlation();
    assert_eq!(by_cid.len(), 3, "one correlation id per execution");
    for (cid, kinds) in by_cid {
        assert_eq!(kinds.len(), 3, "{cid}: {kinds:?}");
        assert_eq!(kinds[0], EventKind::TestStart);
        assert!(kinds[1].is_terminal(), "{cid}: {kinds:?}");
        assert_eq!(kinds[2], EventKind::TestEnd);
    }

    let run_ids: HashSet<_> = log
        .events()
        .into_iter()
        .filter_map(|e| e.field_str("run_id").map(str::to_string))
        .collect();
    assert_eq!(run_ids.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_reporter_does_not_disturb_others() {
    let registry = scenario_a();
    let units = registry.units();
    let (recorder, log) = Recording::new("recorder");

    let summary = Orchestrator::builder(quick_config(2))
        .with_resolver(registry)
        .with_reporter(PanicsOnStart)
        .with_reporter(recorder)
        .with_output(tokio::io::sink())
        .build()
        .run(units)
        .await;

    assert_eq!(log.count(&EventKind::TestStart), 3);
    assert_eq!(log.count(&EventKind::TestEnd), 3);
    assert_eq!(log.count(&EventKind::TestSuccess), 1);
    assert_eq!(log.count(&EventKind::TestFailure), 1);
    assert_eq!(log.count(&EventKind::TestError), 1);
    assert_eq!(summary.exit_code(), 1);
    assert!(summary.warnings.is_empty(), "{:?}", summary.warnings);
}

#[tokio::test]
async fn empty_run_brackets_start_and_end() {
    let (recorder, log) = Recording::new("recorder");

    let summary = Orchestrator::builder(quick_config(4))
        .with_reporter(recorder)
        .with_output(tokio::io::sink())
        .build()
        .run(Vec::new())
        .await;

    assert_eq!(log.kinds(), vec![EventKind::TestRunStart, EventKind::TestRunEnd]);
    assert_eq!(summary.scheduled, 0);
    assert_eq!(summary.exit_code(), 0);
}

#[tokio::test]
async fn reporters_only_see_declared_kinds() {
    let registry = scenario_a();
    let units = registry.units();
    let (recorder, log) =
        Recording::with_subscriptions("terminals", EventSet::of([EventKind::TestFailure]));

    Orchestrator::builder(quick_config(2))
        .with_resolver(registry)
        .with_reporter(recorder)
        .with_output(tokio::io::sink())
        .build()
        .run(units)
        .await;

    assert_eq!(log.kinds(), vec![EventKind::TestFailure]);
}

#[tokio::test]
async fn custom_events_reach_subscribed_reporters() {
    let mut registry = CaseRegistry::new();
    registry.add_fn("pkg.tests", "Progress", "test_publishes", |ctx: TestContext| async move {
        ctx.publish_data("progress", &serde_json::json!({ "step": 1 }))
            .map_err(|e| TestError::error(e.to_string()))?;
        Ok::<_, TestError>(())
    });
    let units = registry.units();
    let (recorder, log) = Recording::with_subscriptions(
        "progress",
        EventSet::of([EventKind::TestStart]).with(EventKind::custom("progress")),
    );

    Orchestrator::builder(quick_config(1))
        .with_resolver(registry)
        .with_reporter(recorder)
        .with_output(tokio::io::sink())
        .build()
        .run(units)
        .await;

    let events = log.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, EventKind::TestStart);
    assert_eq!(events[1].kind, EventKind::custom("progress"));
    assert_eq!(events[1].correlation_id, events[0].correlation_id);
    assert_eq!(events[1].fields["data"]["step"], 1);
}

#[tokio::test]
async fn unresolved_units_end_in_test_error() {
    let (recorder, log) = Recording::new("recorder");
    let units = vec![testvisor::TestUnit::new("pkg.missing", "Nope", "test_x")];

    let summary = Orchestrator::builder(quick_config(1))
        .with_reporter(recorder)
        .with_output(tokio::io::sink())
        .build()
        .run(units)
        .await;

    let kinds: Vec<_> = log
        .kinds()
        .into_iter()
        .filter(|k| !matches!(k, EventKind::TestRunStart | EventKind::TestRunEnd))
        .collect();
    assert_eq!(kinds, vec![EventKind::TestStart, EventKind::TestError, EventKind::TestEnd]);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.exit_code(), 1);
}

#[tokio::test]
async fn unknown_reporter_is_a_warning_not_a_failure() {
    let mut registry = CaseRegistry::new();
    registry.add_fn("pkg.tests", "Ok", "test_ok", |_ctx: TestContext| async { Ok::<_, TestError>(()) });
    let units = registry.units();
    let (recorder, log) = Recording::new("recorder");

    let mut cfg = quick_config(1);
    cfg.reporters = vec![ReporterSpec::named("JUnitXmlReporter")];

    let summary = Orchestrator::builder(cfg)
        .with_resolver(registry)
        .with_reporter(recorder)
        .with_output(tokio::io::sink())
        .build()
        .run(units)
        .await;

    assert_eq!(log.count(&EventKind::TestSuccess), 1);
    assert_eq!(
        summary.warnings,
        vec![RuntimeError::UnknownReporter("JUnitXmlReporter".into())]
    );
    assert_eq!(summary.exit_code(), 0);
}

#[cfg(feature = "console")]
#[tokio::test]
async fn configured_console_reporter_writes_lines() {
    let mut registry = CaseRegistry::new();
    registry.add_fn("pkg.tests", "Ok", "test_ok", |_ctx: TestContext| async { Ok::<_, TestError>(()) });
    let units = registry.units();

    let mut settings = Map::new();
    settings.insert("verbose".into(), true.into());
    let mut cfg = quick_config(1);
    cfg.reporters = vec![ReporterSpec {
        name: "console".into(),
        config: settings,
    }];

    let (writer, mut reader) = tokio::io::duplex(64 * 1024);
    let summary = Orchestrator::builder(cfg)
        .with_resolver(registry)
        .with_output(writer)
        .build()
        .run(units)
        .await;
    assert_eq!(summary.exit_code(), 0);

    let mut text = String::new();
    tokio::io::AsyncReadExt::read_to_string(&mut reader, &mut text)
        .await
        .unwrap();
    assert!(text.contains("[ok] test=pkg.tests.Ok.test_ok"), "{text}");
    assert!(text.lines().last().unwrap().starts_with("[run-end] total=1 passed=1"), "{text}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_reporter_sees_every_terminal() {
    let n = 600;
    let (registry, units) = passing_units(n);
    let (recorder, log) = Recording::with_subscriptions(
        "slow",
        EventSet::of([EventKind::TestSuccess, EventKind::TestRunEnd]),
    );

    let mut cfg = quick_config(4);
    cfg.sink_join_timeout = Duration::from_secs(30);
    let summary = Orchestrator::builder(cfg)
        .with_resolver(registry)
        .with_reporter(recorder.slowed(Duration::from_millis(1)))
        .with_output(tokio::io::sink())
        .build()
        .run(units)
        .await;

    assert_eq!(summary.passed, n as u64);
    assert!(summary.warnings.is_empty(), "{:?}", summary.warnings);
    assert_eq!(log.count(&EventKind::TestSuccess), n);
    assert_eq!(log.kinds().last(), Some(&EventKind::TestRunEnd));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn high_volume_counts_match_for_fast_and_slow_reporters() {
    let n = 1_000;
    let (registry, units) = passing_units(n);
    let (fast, fast_log) = Recording::new("fast");
    let (slow, slow_log) = Recording::new("slow");

    let mut cfg = quick_config(8);
    cfg.sink_join_timeout = Duration::from_secs(30);
    let summary = Orchestrator::builder(cfg)
        .with_resolver(registry)
        .with_reporter(fast)
        .with_reporter(slow.slowed(Duration::from_millis(1)))
        .with_output(tokio::io::sink())
        .build()
        .run(units)
        .await;

    assert_eq!(summary.passed, n as u64);
    assert!(summary.warnings.is_empty(), "{:?}", summary.warnings);
    for log in [&fast_log, &slow_log] {
        assert_eq!(log.count(&EventKind::TestStart), n);
        assert_eq!(log.count(&EventKind::TestSuccess), n);
        assert_eq!(log.count(&EventKind::TestEnd), n);
        assert_eq!(log.count(&EventKind::TestRunEnd), 1);
        assert_eq!(log.kinds().last(), Some(&EventKind::TestRunEnd));
        assert_eq!(log.by_correlation().len(), n);
    }
}
