//! Ordered key/value rows.

use serde::{Deserialize, Serialize};

/// A single `{key, value}` row as edited in a draft or variable set.
///
/// Rows keep their order; duplicate keys are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct KeyValue {
    /// Row key.
    #[serde(default)]
    pub key: String,
    /// Row value.
    #[serde(default)]
    pub value: String,
}

impl KeyValue {
    /// Creates a new row.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns true if both key and value are non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.key.is_empty() && !self.value.is_empty()
    }
}
