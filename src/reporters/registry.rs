//! # Reporter loading by name.
//!
//! [`ReporterRegistry`] maps a reporter identifier to a factory that builds a
//! fresh [`Reporter`] from a [`ReporterConfig`]. The orchestrator resolves
//! `Config::reporters` through it when loading sinks; an unknown identifier
//! is reported as [`RuntimeError::UnknownReporter`] and skipped.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::Reporter;
use crate::error::{ReporterError, RuntimeError};

/// Per-reporter configuration (free-form JSON object).
pub type ReporterConfig = Map<String, Value>;

type ReporterFactory =
    Arc<dyn Fn(&ReporterConfig) -> Result<Box<dyn Reporter>, ReporterError> + Send + Sync>;

/// Name → factory table.
#[derive(Default, Clone)]
pub struct ReporterRegistry {
    factories: HashMap<String, ReporterFactory>,
}

impl ReporterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in reporters registered.
    ///
    /// With the `console` feature: `console`, `ConsoleReporter` and
    /// `DefaultReporter` all build a [`ConsoleReporter`](super::ConsoleReporter).
    pub fn with_builtins() -> Self {
        #[allow(unused_mut)]
        let mut reg = Self::new();
        #[cfg(feature = "console")]
        for name in ["console", "ConsoleReporter", "DefaultReporter"] {
            reg.register(name, |cfg| {
                Ok(Box::new(super::ConsoleReporter::from_config(cfg)?) as Box<dyn Reporter>)
            });
        }
        reg
    }

    /// Registers (or replaces) a factory under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&ReporterConfig) -> Result<Box<dyn Reporter>, ReporterError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// True if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered identifiers, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Builds the reporter registered under `name`.
    pub fn load(&self, name: &str, cfg: &ReporterConfig) -> Result<Box<dyn Reporter>, RuntimeError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownReporter(name.to_string()))?;
        factory(cfg).map_err(|e| RuntimeError::ReporterConfig {
            name: name.to_string(),
            error: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_is_reported() {
        let err = ReporterRegistry::new()
            .load("junit", &ReporterConfig::new())
            .err()
            .unwrap();
        assert_eq!(err, RuntimeError::UnknownReporter("junit".into()));
    }

    #[test]
    fn factory_errors_carry_the_name() {
        let mut reg = ReporterRegistry::new();
        reg.register("broken", |_cfg| Err(ReporterError::Failed("missing path".into())));
        let err = reg.load("broken", &ReporterConfig::new()).err().unwrap();
        assert_eq!(err.as_label(), "runtime_reporter_config");
        assert!(err.to_string().contains("broken"));
    }

    #[cfg(feature = "console")]
    #[test]
    fn builtins_include_default_reporter() {
        let reg = ReporterRegistry::with_builtins();
        assert_eq!(reg.names(), vec!["ConsoleReporter", "DefaultReporter", "console"]);
        let rep = reg.load("DefaultReporter", &ReporterConfig::new()).unwrap();
        assert_eq!(rep.name(), "console");
    }
}
