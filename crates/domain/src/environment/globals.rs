//! Process-wide global variables.

use serde::{Deserialize, Serialize};

use super::variable::{VariableMap, rows_to_map};
use crate::request::KeyValue;

/// The single global variable set, merged under every environment.
///
/// Serialized as a bare list of `{key, value}` rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct GlobalVariableSet {
    /// Variable rows in declaration order.
    pub variables: Vec<KeyValue>,
}

impl GlobalVariableSet {
    /// Creates an empty global set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            variables: Vec::new(),
        }
    }

    /// Appends a variable row.
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.push(KeyValue::new(key, value));
        self
    }

    /// Flattens the rows into a map; later duplicates win and empty keys are skipped.
    #[must_use]
    pub fn to_map(&self) -> VariableMap {
        rows_to_map(&self.variables)
    }
}
