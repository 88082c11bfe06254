//! # Run configuration.
//!
//! Provides [`Config`], the settings consumed by the
//! [`Orchestrator`](crate::Orchestrator).
//!
//! Config can be built three ways:
//! 1. **In code**: `Config::default()` and field updates.
//! 2. **From JSON**: `serde_json::from_str::<Config>(..)`; missing fields keep
//!    their defaults, durations are given in milliseconds.
//! 3. **From the environment**: [`Config::from_env`].
//!
//! ## Sentinel values
//! - `worker_count = 0` → one worker per available core

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::reporters::ReporterConfig;

/// Environment variable overriding [`Config::worker_count`].
pub const ENV_WORKERS: &str = "TESTVISOR_WORKERS";
/// Environment variable overriding [`Config::fail_fast`].
pub const ENV_FAIL_FAST: &str = "TESTVISOR_FAIL_FAST";
/// Environment variable overriding [`Config::catch_interrupt`].
pub const ENV_CATCH_INTERRUPT: &str = "TESTVISOR_CATCH_INTERRUPT";

/// One reporter to load by name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReporterSpec {
    /// Identifier registered in the [`ReporterRegistry`](crate::ReporterRegistry).
    pub name: String,
    /// Reporter-specific settings.
    #[serde(default)]
    pub config: ReporterConfig,
}

impl ReporterSpec {
    /// A reporter with empty configuration.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: ReporterConfig::new(),
        }
    }
}

/// Configuration of one orchestrator run.
///
/// ## Field semantics
/// - `worker_count`: parallel workers (`0` = host cores)
/// - `fail_fast`: stop dispatching after the first failure or error
/// - `catch_interrupt`: install an interrupt handler for graceful shutdown
/// - `reporters`: reporters to load; empty loads the default console reporter
/// - `flush_window`: pause between `test_run_end` and stopping the bus
/// - `bus_join_timeout` / `sink_join_timeout`: join bounds before a loop is given up on
/// - `grace`: how long in-flight units may run after an interrupt
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of parallel workers.
    ///
    /// - `0` = one per available core
    /// - `n > 0` = exactly `n` workers
    pub worker_count: usize,

    /// Stop claiming new units after the first `test_failure` / `test_error`.
    ///
    /// Units already claimed run to completion.
    pub fail_fast: bool,

    /// Handle SIGINT/SIGTERM/Ctrl-C by stopping dispatch and shutting down
    /// within [`Config::grace`].
    ///
    /// Without it no handler is installed and an interrupt terminates the process.
    pub catch_interrupt: bool,

    /// Reporters to load, in order.
    pub reporters: Vec<ReporterSpec>,

    /// Wait between `test_run_end` and `STOP`, letting late events drain.
    #[serde(with = "duration_ms")]
    pub flush_window: Duration,

    /// Bound for the relay loop to exit after `STOP`.
    #[serde(with = "duration_ms")]
    pub bus_join_timeout: Duration,

    /// Bound for each sink to exit after `STOP`.
    #[serde(with = "duration_ms")]
    pub sink_join_timeout: Duration,

    /// Maximum wait for in-flight units after an interrupt before they are aborted.
    #[serde(with = "duration_ms")]
    pub grace: Duration,
}

impl Config {
    /// Number of workers to spawn, resolving the `0` sentinel.
    #[inline]
    pub fn effective_workers(&self) -> usize {
        match self.worker_count {
            0 => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            n => n,
        }
    }

    /// Default configuration with overrides from the process environment.
    ///
    /// Reads [`ENV_WORKERS`], [`ENV_FAIL_FAST`], [`ENV_CATCH_INTERRUPT`].
    /// Values that do not parse are logged and ignored.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up by variable name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_WORKERS) {
            match raw.trim().parse::<usize>() {
                Ok(n) => self.worker_count = n,
                Err(e) => warn!(var = ENV_WORKERS, value = %raw, error = %e, "ignoring invalid override"),
            }
        }
        if let Some(raw) = lookup(ENV_FAIL_FAST) {
            match parse_flag(&raw) {
                Some(v) => self.fail_fast = v,
                None => warn!(var = ENV_FAIL_FAST, value = %raw, "ignoring invalid override"),
            }
        }
        if let Some(raw) = lookup(ENV_CATCH_INTERRUPT) {
            match parse_flag(&raw) {
                Some(v) => self.catch_interrupt = v,
                None => warn!(var = ENV_CATCH_INTERRUPT, value = %raw, "ignoring invalid override"),
            }
        }
        self
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `worker_count = 0` (host cores)
    /// - `fail_fast = false`, `catch_interrupt = false`
    /// - `reporters = []` (console reporter)
    /// - `flush_window = 500ms`
    /// - `bus_join_timeout = 5s`, `sink_join_timeout = 5s`
    /// - `grace = 5s`
    fn default() -> Self {
        Self {
            worker_count: 0,
            fail_fast: false,
            catch_interrupt: false,
            reporters: Vec::new(),
            flush_window: Duration::from_millis(500),
            bus_join_timeout: Duration::from_secs(5),
            sink_join_timeout: Duration::from_secs(5),
            grace: Duration::from_secs(5),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn zero_workers_means_host_cores() {
        let cfg = Config::default();
        assert!(cfg.effective_workers() >= 1);
        let cfg = Config {
            worker_count: 3,
            ..Config::default()
        };
        assert_eq!(cfg.effective_workers(), 3);
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let cfg: Config = serde_json::from_str(
            r#"{"worker_count":2,"grace":250,"reporters":[{"name":"console","config":{"verbose":false}}]}"#,
        )
        .unwrap();
        assert_eq!(cfg.worker_count, 2);
        assert_eq!(cfg.grace, Duration::from_millis(250));
        assert_eq!(cfg.flush_window, Duration::from_millis(500));
        assert_eq!(cfg.reporters[0].name, "console");
        assert_eq!(cfg.reporters[0].config["verbose"], false);
    }

    #[test]
    fn overrides_apply_and_bad_values_are_ignored() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_WORKERS, "4"),
            (ENV_FAIL_FAST, "yes"),
            (ENV_CATCH_INTERRUPT, "maybe"),
        ]);
        let cfg = Config::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.worker_count, 4);
        assert!(cfg.fail_fast);
        assert!(!cfg.catch_interrupt);
    }
}
