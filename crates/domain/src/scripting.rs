//! Data exchanged with the script sandbox.

use serde::{Deserialize, Serialize};

use crate::request::{HeaderMap, KeyValue};

/// The working copy a pre-request script may change through its mutators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PreRequestContext {
    /// Materialized headers; `setHeader` overwrites or creates.
    pub headers: HeaderMap,
    /// Query parameters; `setQuery` appends.
    pub params: Vec<KeyValue>,
    /// Raw body; `setBody` replaces.
    pub body: String,
    /// Form-data rows; `setFormField` appends.
    pub form_data: Vec<KeyValue>,
}

impl PreRequestContext {
    /// Creates a context from the working copies.
    #[must_use]
    pub const fn new(
        headers: HeaderMap,
        params: Vec<KeyValue>,
        body: String,
        form_data: Vec<KeyValue>,
    ) -> Self {
        Self {
            headers,
            params,
            body,
            form_data,
        }
    }
}

/// Result of a pre-request script run.
///
/// The context always carries every mutation made before a failure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreRequestOutcome {
    /// The context after the script ran.
    pub context: PreRequestContext,
    /// Lines written through `log(...)`.
    pub logs: Vec<String>,
    /// Message of the error that stopped the script, if any.
    pub error: Option<String>,
}

impl PreRequestOutcome {
    /// An outcome where the script changed nothing.
    #[must_use]
    pub fn unchanged(context: PreRequestContext) -> Self {
        Self {
            context,
            logs: Vec::new(),
            error: None,
        }
    }
}
