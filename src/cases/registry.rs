//! # Resolving test units to runnable cases.
//!
//! Workers never share test instances: for every execution they ask a
//! [`Resolve`] implementation for a **fresh** [`TestCase`]. [`CaseRegistry`]
//! is the built-in resolver, keyed by module and class, with one factory per
//! test name.
//!
//! ## Example
//! ```rust
//! use testvisor::{CaseRegistry, Resolve, TestContext, TestError, TestUnit};
//!
//! let mut registry = CaseRegistry::new();
//! registry.add_fn("pkg.tests", "FastTests", "test_fast_pass", |_ctx: TestContext| async {
//!     Ok::<_, TestError>(())
//! });
//!
//! let unit = TestUnit::new("pkg.tests", "FastTests", "test_fast_pass");
//! assert!(registry.resolve(&unit).is_ok());
//! assert_eq!(registry.units(), vec![unit]);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use crate::cases::{BlockingFn, TestCase, TestContext, TestFn, TestUnit};
use crate::error::{HarnessError, TestError};

/// Resolves a unit into a fresh test case instance.
pub trait Resolve: Send + Sync + 'static {
    /// Builds the case for `unit`, or explains why it cannot be built.
    fn resolve(&self, unit: &TestUnit) -> Result<Box<dyn TestCase>, HarnessError>;
}

type CaseFactory = Arc<dyn Fn() -> Box<dyn TestCase> + Send + Sync>;

/// Registry of case factories grouped by `(module, class)`.
#[derive(Default, Clone)]
pub struct CaseRegistry {
    classes: HashMap<(String, String), BTreeMap<String, CaseFactory>>,
}

impl CaseRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory producing a fresh case per execution.
    ///
    /// Registering the same name twice replaces the previous factory.
    pub fn add<C, F>(
        &mut self,
        module: impl Into<String>,
        class: impl Into<String>,
        test: impl Into<String>,
        factory: F,
    ) -> &mut Self
    where
        C: TestCase,
        F: Fn() -> C + Send + Sync + 'static,
    {
        let factory: CaseFactory = Arc::new(move || Box::new(factory()) as Box<dyn TestCase>);
        self.classes
            .entry((module.into(), class.into()))
            .or_default()
            .insert(test.into(), factory);
        self
    }

    /// Registers an async function body.
    pub fn add_fn<F, Fut>(
        &mut self,
        module: impl Into<String>,
        class: impl Into<String>,
        test: impl Into<String>,
        f: F,
    ) -> &mut Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TestError>> + Send + 'static,
    {
        let f = Arc::new(f);
        self.add(module, class, test, move || TestFn::from_arc(Arc::clone(&f)))
    }

    /// Registers a synchronous body that runs on the blocking pool.
    pub fn add_blocking<F>(
        &mut self,
        module: impl Into<String>,
        class: impl Into<String>,
        test: impl Into<String>,
        f: F,
    ) -> &mut Self
    where
        F: Fn(TestContext) -> Result<(), TestError> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.add(module, class, test, move || BlockingFn::from_arc(Arc::clone(&f)))
    }

    /// Lists every registered unit, sorted by module, class and test.
    pub fn units(&self) -> Vec<TestUnit> {
        let mut classes: Vec<_> = self.classes.iter().collect();
        classes.sort_by(|a, b| a.0.cmp(b.0));
        classes
            .into_iter()
            .flat_map(|((module, class), tests)| {
                tests
                    .keys()
                    .map(move |test| TestUnit::new(module.as_str(), class.as_str(), test.as_str()))
            })
            .collect()
    }

    /// Number of registered tests.
    pub fn len(&self) -> usize {
        self.classes.values().map(BTreeMap::len).sum()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Resolve for CaseRegistry {
    fn resolve(&self, unit: &TestUnit) -> Result<Box<dyn TestCase>, HarnessError> {
        let key = (unit.module_name.clone(), unit.class_name.clone());
        let tests = self.classes.get(&key).ok_or_else(|| HarnessError::Unresolved {
            module: unit.module_name.clone(),
            class: unit.class_name.clone(),
        })?;
        let factory = tests
            .get(&unit.test_name)
            .ok_or_else(|| HarnessError::UnknownTest {
                module: unit.module_name.clone(),
                class: unit.class_name.clone(),
                test: unit.test_name.clone(),
            })?;
        Ok(factory())
    }
}
