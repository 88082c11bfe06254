//! # Console reporter.
//!
//! [`ConsoleReporter`] prints one line per lifecycle event and a summary when
//! the run ends. It is the default reporter when none is configured.
//!
//! ## Output format
//! ```text
//! [run-start] run_id=5f0c...
//! [start] test=pkg.tests.FastTests.test_fast_pass
//! [ok] test=pkg.tests.FastTests.test_fast_pass
//! [fail] test=pkg.tests.FastTests.test_eq failure="assertion `left == right` failed ..."
//! [error] test=pkg.tests.FastTests.test_boom error="boom"
//! [skip] test=pkg.tests.FastTests.test_later reason="not on ci"
//! [run-end] total=3 passed=1 failed=1 errors=1 skipped=0 expected_failures=0 unexpected_successes=0
//! ```
//!
//! ## Configuration
//! - `verbose` (bool, default `true`): when `false`, only failures, errors
//!   and the run summary are printed.

use async_trait::async_trait;
use serde::Deserialize;

use super::{EventSet, Reporter, ReporterConfig, ReporterOutput};
use crate::error::ReporterError;
use crate::events::{Event, EventKind};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Settings {
    verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self { verbose: true }
    }
}

/// Human-readable line reporter.
#[derive(Debug)]
pub struct ConsoleReporter {
    verbose: bool,
    started: u64,
    passed: u64,
    failed: u64,
    errors: u64,
    skipped: u64,
    expected_failures: u64,
    unexpected_successes: u64,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConsoleReporter {
    /// Creates a reporter; `verbose = false` prints only problems and the summary.
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            started: 0,
            passed: 0,
            failed: 0,
            errors: 0,
            skipped: 0,
            expected_failures: 0,
            unexpected_successes: 0,
        }
    }

    /// Builds the reporter from its `{"verbose": bool}` configuration.
    pub fn from_config(cfg: &ReporterConfig) -> Result<Self, ReporterError> {
        let settings: Settings = serde_json::from_value(cfg.clone().into())
            .map_err(|e| ReporterError::Failed(format!("invalid console config: {e}")))?;
        Ok(Self::new(settings.verbose))
    }

    fn summary(&self) -> String {
        format!(
            "[run-end] total={} passed={} failed={} errors={} skipped={} expected_failures={} unexpected_successes={}",
            self.started,
            self.passed,
            self.failed,
            self.errors,
            self.skipped,
            self.expected_failures,
            self.unexpected_successes
        )
    }
}

fn test_label(ev: &Event) -> String {
    match (
        ev.field_str("module_name"),
        ev.field_str("class_name"),
        ev.field_str("test_name"),
    ) {
        (Some(m), Some(c), Some(t)) => format!("{m}.{c}.{t}"),
        (_, _, Some(t)) => t.to_string(),
        _ => "?".to_string(),
    }
}

#[async_trait]
impl Reporter for ConsoleReporter {
    fn name(&self) -> &str {
        "console"
    }

    fn subscriptions(&self) -> EventSet {
        EventSet::vocabulary()
    }

    async fn on_event(&mut self, ev: &Event, out: &ReporterOutput) -> Result<(), ReporterError> {
        let test = test_label(ev);
        match &ev.kind {
            EventKind::TestRunStart => {
                out.line(format!("[run-start] run_id={}", ev.field_str("run_id").unwrap_or("?")));
            }
            EventKind::TestStart => {
                self.started += 1;
                if self.verbose {
                    out.line(format!("[start] test={test}"));
                }
            }
            EventKind::TestSuccess => {
                self.passed += 1;
                if self.verbose {
                    out.line(format!("[ok] test={test}"));
                }
            }
            EventKind::TestFailure => {
                self.failed += 1;
                out.line(format!(
                    "[fail] test={test} failure={:?}",
                    ev.field_str("failure").unwrap_or_default()
                ));
            }
            EventKind::TestError => {
                self.errors += 1;
                out.line(format!(
                    "[error] test={test} error={:?}",
                    ev.field_str("error").unwrap_or_default()
                ));
            }
            EventKind::TestSkip => {
                self.skipped += 1;
                if self.verbose {
                    out.line(format!(
                        "[skip] test={test} reason={:?}",
                        ev.field_str("reason").unwrap_or_default()
                    ));
                }
            }
            EventKind::TestExpectedFailure => {
                self.expected_failures += 1;
                if self.verbose {
                    out.line(format!("[xfail] test={test}"));
                }
            }
            EventKind::TestUnexpectedSuccess => {
                self.unexpected_successes += 1;
                out.line(format!("[xpass] test={test}"));
            }
            EventKind::TestRunInterrupted => out.line("[interrupted]"),
            EventKind::TestRunEnd => out.line(self.summary()),
            EventKind::TestEnd => {}
            other => return Err(ReporterError::Unsupported(other.clone())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CorrelationId;
    use crate::reporters::OutputRelay;
    use crate::TestUnit;
    use serde_json::json;

    async fn render(reporter: &mut ConsoleReporter, events: Vec<Event>) -> String {
        let relay = OutputRelay::spawn(Vec::<u8>::new());
        let out = relay.handle("console");
        for ev in &events {
            reporter.on_event(ev, &out).await.unwrap();
        }
        drop(out);
        String::from_utf8(relay.finish().await.unwrap()).unwrap()
    }

    fn unit_event(kind: EventKind) -> Event {
        Event::new(kind).with_unit(&TestUnit::new("m", "C", "t"))
    }

    #[tokio::test]
    async fn prints_lines_and_summary() {
        let run = CorrelationId::new();
        let mut rep = ConsoleReporter::default();
        let text = render(
            &mut rep,
            vec![
                Event::run(EventKind::TestRunStart, &run),
                unit_event(EventKind::TestStart),
                unit_event(EventKind::TestFailure).with_field("failure", "1 != 2"),
                unit_event(EventKind::TestEnd),
                Event::run(EventKind::TestRunEnd, &run),
            ],
        )
        .await;

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], format!("[run-start] run_id={run}"));
        assert_eq!(lines[1], "[start] test=m.C.t");
        assert_eq!(lines[2], r#"[fail] test=m.C.t failure="1 != 2""#);
        assert!(lines[3].starts_with("[run-end] total=1 passed=0 failed=1 errors=0"));
    }

    #[tokio::test]
    async fn quiet_mode_hides_progress() {
        let cfg = json!({"verbose": false}).as_object().cloned().unwrap();
        let mut rep = ConsoleReporter::from_config(&cfg).unwrap();
        let text = render(
            &mut rep,
            vec![unit_event(EventKind::TestStart), unit_event(EventKind::TestSuccess)],
        )
        .await;
        assert!(text.is_empty());
        assert_eq!(rep.passed, 1);
    }

    #[test]
    fn rejects_malformed_config() {
        let cfg = json!({"verbose": "loud"}).as_object().cloned().unwrap();
        assert!(ConsoleReporter::from_config(&cfg).is_err());
    }

    #[tokio::test]
    async fn custom_kinds_are_unsupported() {
        let relay = OutputRelay::spawn(Vec::<u8>::new());
        let out = relay.handle("console");
        let err = ConsoleReporter::default()
            .on_event(&Event::new(EventKind::custom("coverage")), &out)
            .await
            .unwrap_err();
        assert!(matches!(err, ReporterError::Unsupported(_)));
    }
}
