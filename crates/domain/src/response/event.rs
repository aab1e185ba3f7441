//! Streaming event records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::generate_id;

/// One message received over a WebSocket or SSE stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique id of the event.
    pub id: String,
    /// Event type: `message` for WebSocket frames, the `event:` field for SSE.
    #[serde(rename = "type")]
    pub kind: String,
    /// Event payload as text.
    pub data: String,
    /// Receive time.
    pub time: DateTime<Utc>,
}

impl EventRecord {
    /// Creates a record with a fresh id.
    #[must_use]
    pub fn new(kind: impl Into<String>, data: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(),
            kind: kind.into(),
            data: data.into(),
            time,
        }
    }
}
