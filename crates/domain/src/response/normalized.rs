//! The protocol-independent response record.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EventRecord;
use crate::testing::AssertionResult;

/// Status text of an HTTP exchange that failed before a response arrived.
pub const REQUEST_FAILED_TEXT: &str = "Request Failed";

/// A response header value; repeated headers become a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    /// Header received once.
    Single(String),
    /// Header received several times, in arrival order.
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// Returns all values in arrival order.
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Adds another occurrence of the header.
    pub fn push(&mut self, value: impl Into<String>) {
        match self {
            Self::Single(first) => {
                *self = Self::Multiple(vec![std::mem::take(first), value.into()]);
            }
            Self::Multiple(values) => values.push(value.into()),
        }
    }
}

/// The single response shape produced for HTTP, GraphQL, WebSocket and SSE.
///
/// `status` is `None` when no HTTP status was received (network failures and
/// streaming sessions). A 4xx/5xx response keeps its status and has no `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResponse {
    /// HTTP status, if one was received.
    pub status: Option<u16>,
    /// Reason phrase or a fixed descriptive text.
    pub status_text: String,
    /// Body as JSON when it parses, otherwise text.
    pub data: Value,
    /// Response headers, lowercase names.
    pub headers: IndexMap<String, HeaderValue>,
    /// Elapsed time since the send started. Serialized as `durationMs`.
    #[serde(alias = "duration_ms")]
    pub duration_ms: u64,
    /// Failure message, if the exchange failed.
    pub error: Option<String>,
    /// Byte length of the rendered body.
    pub size: usize,
    /// Results of the test script, in call order.
    #[serde(default)]
    pub assertions: Vec<AssertionResult>,
    /// Events collected by a streaming send.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<EventRecord>>,
}

impl NormalizedResponse {
    /// Creates a response with the given status line and body; size is derived from `data`.
    #[must_use]
    pub fn new(status: Option<u16>, status_text: impl Into<String>, data: Value) -> Self {
        let size = render_data(&data).len();
        Self {
            status,
            status_text: status_text.into(),
            data,
            headers: IndexMap::new(),
            duration_ms: 0,
            error: None,
            size,
            assertions: Vec::new(),
            events: None,
        }
    }

    /// Response for a transport failure: no status, the message as body and error.
    #[must_use]
    pub fn failure(message: impl Into<String>, duration_ms: u64) -> Self {
        let message = message.into();
        Self::new(None, REQUEST_FAILED_TEXT, Value::String(message.clone()))
            .with_duration(duration_ms)
            .with_error(message)
    }

    /// Rendering of an aborted send.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(None, "Cancelled", Value::String("Request cancelled".to_string()))
            .with_error("Cancelled")
    }

    /// Sets the headers.
    #[must_use]
    pub fn with_headers(mut self, headers: IndexMap<String, HeaderValue>) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the elapsed time.
    #[must_use]
    pub const fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Sets the error message.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Sets the collected events.
    #[must_use]
    pub fn with_events(mut self, events: Vec<EventRecord>) -> Self {
        self.events = Some(events);
        self
    }

    /// Overrides the computed size.
    #[must_use]
    pub const fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Looks up a header case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Returns true for a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_some_and(|status| (200..300).contains(&status))
    }

    /// Returns true if every assertion passed (vacuously true without assertions).
    #[must_use]
    pub fn all_assertions_passed(&self) -> bool {
        self.assertions.iter().all(|assertion| assertion.ok)
    }
}

/// Renders body data the way it is displayed: strings as-is, other JSON pretty-printed.
#[must_use]
pub fn render_data(data: &Value) -> String {
    match data {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}
