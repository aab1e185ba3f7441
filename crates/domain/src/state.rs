//! Send lifecycle phases.
//!
//! The dispatcher publishes the current phase so a front end can show
//! progress and offer cancellation while a request is in flight.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the current send.
///
/// `Idle -> Resolving -> ScriptingPre -> Sending -> ScriptingAssert -> Recorded`,
/// ending in `Recorded`, `Cancelled` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SendPhase {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Substituting variables.
    Resolving,
    /// Running the pre-request script.
    ScriptingPre,
    /// Waiting on the network.
    Sending,
    /// Running the test script.
    ScriptingAssert,
    /// The exchange was handed to the history recorder.
    Recorded,
    /// The send was cancelled.
    Cancelled,
    /// The exchange ended with a transport error; it was still recorded.
    Failed,
}

impl SendPhase {
    /// Returns true for `Recorded`, `Cancelled` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Recorded | Self::Cancelled | Self::Failed)
    }

    /// Returns true while a send is in progress.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        !self.is_terminal() && !matches!(self, Self::Idle)
    }

    /// Returns true in the only phase where cancellation is observed.
    #[must_use]
    pub const fn can_cancel(self) -> bool {
        matches!(self, Self::Sending)
    }
}

impl fmt::Display for SendPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::ScriptingPre => "scripting-pre",
            Self::Sending => "sending",
            Self::ScriptingAssert => "scripting-assert",
            Self::Recorded => "recorded",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
