//! Script errors.

use thiserror::Error;

/// Errors raised while parsing or running a script.
///
/// The `Display` text is what a failing assertion shows, so runtime variants
/// read like the messages scripting users already know.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    /// The source could not be tokenized or parsed.
    #[error("SyntaxError: {message} (line {line})")]
    Syntax {
        /// 1-based line of the offending token.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// A name that is neither a local nor a capability.
    #[error("{0} is not defined")]
    Reference(String),

    /// An operation on a value of the wrong kind.
    #[error("{0}")]
    Type(String),

    /// Assignment to a `const` binding or an undeclared name.
    #[error("Assignment to {0}")]
    Assignment(String),

    /// A value thrown by the script itself.
    #[error("{0}")]
    Thrown(String),

    /// A value grew past the sandbox limits.
    #[error("RangeError: {0}")]
    Range(String),
}

impl ScriptError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn too_large() -> Self {
        Self::Range("value exceeds the sandbox size limit".to_string())
    }
}
