//! Named environment variable sets.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::id::generate_id;
use crate::request::KeyValue;

/// Flattened variable lookup, name to value.
pub type VariableMap = HashMap<String, String>;

/// A named, ordered set of variables. At most one environment is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariableSet {
    /// Stable identifier.
    #[serde(default = "generate_id")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Variable rows in declaration order.
    #[serde(default)]
    pub variables: Vec<KeyValue>,
}

impl EnvironmentVariableSet {
    /// Creates an empty environment with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
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

pub(super) fn rows_to_map(rows: &[KeyValue]) -> VariableMap {
    rows.iter()
        .filter(|row| !row.key.is_empty())
        .map(|row| (row.key.clone(), row.value.clone()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_later_duplicates_win() {
        let env = EnvironmentVariableSet::new("dev")
            .with_variable("host", "a")
            .with_variable("", "ignored")
            .with_variable("host", "b");

        let map = env.to_map();

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("host").unwrap(), "b");
    }

    #[test]
    fn test_deserialize_without_id_generates_one() {
        let env: EnvironmentVariableSet =
            serde_json::from_str(r#"{"name": "prod", "variables": [{"key": "k", "value": "v"}]}"#)
                .unwrap();

        assert_eq!(env.name, "prod");
        assert_eq!(env.id.len(), 36);
        assert_eq!(env.variables, vec![KeyValue::new("k", "v")]);
    }
}
