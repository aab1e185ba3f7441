//! Assertion results produced by test scripts.

use serde::{Deserialize, Serialize};

/// Default message of an assertion called without one.
pub const DEFAULT_ASSERTION_MESSAGE: &str = "Assertion";

/// Outcome of one `assert(condition, message)` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionResult {
    /// Whether the condition was truthy.
    pub ok: bool,
    /// Message given to the call.
    pub message: String,
}

impl AssertionResult {
    /// A passing result.
    #[must_use]
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    /// A failing result.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}
