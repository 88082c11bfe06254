//! # Schedulable test identifiers.
//!
//! A [`TestUnit`] names one test: module, class and method, plus free-form
//! `additional_data`. Units come from discovery, are immutable afterwards and
//! travel to workers by value.
//!
//! ## Wire form
//! ```json
//! {"module_name":"pkg.tests","class_name":"FastTests","test_name":"test_fast_pass","additional_data":{}}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of one schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestUnit {
    /// Module (namespace) containing the class.
    pub module_name: String,
    /// Class (group) containing the test.
    pub class_name: String,
    /// Test (method) name.
    pub test_name: String,
    /// Extra data supplied by discovery; defaults to `{}`.
    #[serde(default)]
    pub additional_data: Map<String, Value>,
}

impl TestUnit {
    /// Creates a unit with empty `additional_data`.
    pub fn new(
        module_name: impl Into<String>,
        class_name: impl Into<String>,
        test_name: impl Into<String>,
    ) -> Self {
        Self {
            module_name: module_name.into(),
            class_name: class_name.into(),
            test_name: test_name.into(),
            additional_data: Map::new(),
        }
    }

    /// Returns the unit with one more `additional_data` entry.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.additional_data.insert(key.into(), value.into());
        self
    }

    /// Encodes the wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes the wire form.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl fmt::Display for TestUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.module_name, self.class_name, self.test_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_wire_schema() {
        let unit = TestUnit::new("pkg.tests", "FastTests", "test_fast_pass");
        assert_eq!(
            unit.to_json().unwrap(),
            r#"{"module_name":"pkg.tests","class_name":"FastTests","test_name":"test_fast_pass","additional_data":{}}"#
        );
    }

    #[test]
    fn missing_additional_data_defaults_to_empty() {
        let unit =
            TestUnit::from_json(r#"{"module_name":"m","class_name":"C","test_name":"t"}"#).unwrap();
        assert!(unit.additional_data.is_empty());
        assert_eq!(unit.to_string(), "m.C.t");
    }

    #[test]
    fn additional_data_survives_transport() {
        let unit = TestUnit::new("m", "C", "t").with_data("retries", 2);
        let back = TestUnit::from_json(&unit.to_json().unwrap()).unwrap();
        assert_eq!(back, unit);
    }
}
