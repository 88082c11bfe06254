use std::sync::Arc;

use tokio::io::AsyncWrite;

use super::orchestrator::{Orchestrator, OutputWriter};
use crate::{
    cases::{CaseRegistry, Resolve},
    core::Config,
    reporters::{Reporter, ReporterRegistry},
};

/// Builder for constructing an [`Orchestrator`].
pub struct OrchestratorBuilder {
    cfg: Config,
    resolver: Option<Arc<dyn Resolve>>,
    reporters: Vec<Box<dyn Reporter>>,
    registry: ReporterRegistry,
    output: Option<OutputWriter>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            resolver: None,
            reporters: Vec::new(),
            registry: ReporterRegistry::with_builtins(),
            output: None,
        }
    }

    /// Sets how units are turned into test cases.
    ///
    /// Without a resolver every unit ends in `test_error` (unresolved).
    pub fn with_resolver(mut self, resolver: impl Resolve) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Adds a reporter instance, loaded in addition to `Config::reporters`.
    ///
    /// Once any reporter is given, the default console reporter is not loaded.
    pub fn with_reporter(mut self, reporter: impl Reporter) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    /// Replaces the registry used to resolve `Config::reporters` by name.
    ///
    /// The default reporter is looked up in it as `DefaultReporter`.
    pub fn with_registry(mut self, registry: ReporterRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sends reporter output to `writer` instead of stdout.
    pub fn with_output<W>(mut self, writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.output = Some(Box::new(writer));
        self
    }

    /// Builds the orchestrator.
    pub fn build(self) -> Orchestrator {
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(CaseRegistry::new()));
        let output = self
            .output
            .unwrap_or_else(|| Box::new(tokio::io::stdout()));
        Orchestrator::from_parts(self.cfg, resolver, self.reporters, self.registry, output)
    }
}
