//! Engine Settings Domain Model
//!
//! Timeouts, cookie forwarding and TLS material used by every send.

use serde::{Deserialize, Serialize};

use crate::tls::TlsConfig;

/// Default HTTP timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
/// Largest accepted HTTP timeout.
pub const MAX_TIMEOUT_MS: u64 = 300_000;
/// Default WebSocket safety ceiling.
pub const DEFAULT_WEBSOCKET_TIMEOUT_MS: u64 = 6_000;
/// Default SSE safety ceiling.
pub const DEFAULT_SSE_TIMEOUT_MS: u64 = 6_000;
/// Default SSE event count that finalizes a stream.
pub const DEFAULT_SSE_MAX_EVENTS: usize = 8;
/// Default history retention.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Settings consulted by the dispatcher and the transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// HTTP timeout in milliseconds.
    pub timeout_ms: u64,
    /// Forward stored cookies and use the cookie-aware transport.
    pub with_credentials: bool,
    /// TLS material, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
    /// WebSocket safety ceiling in milliseconds.
    pub websocket_timeout_ms: u64,
    /// SSE safety ceiling in milliseconds.
    pub sse_timeout_ms: u64,
    /// Number of SSE events after which the stream is finalized.
    pub sse_max_events: usize,
    /// Number of exchange records kept by the in-memory history.
    pub history_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            with_credentials: false,
            tls: None,
            websocket_timeout_ms: DEFAULT_WEBSOCKET_TIMEOUT_MS,
            sse_timeout_ms: DEFAULT_SSE_TIMEOUT_MS,
            sse_max_events: DEFAULT_SSE_MAX_EVENTS,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl EngineSettings {
    /// HTTP timeout clamped to `1..=MAX_TIMEOUT_MS`.
    #[must_use]
    pub fn effective_timeout_ms(&self) -> u64 {
        self.timeout_ms.clamp(1, MAX_TIMEOUT_MS)
    }

    /// Sets the HTTP timeout.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Enables or disables cookie forwarding.
    #[must_use]
    pub const fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = enabled;
        self
    }

    /// Sets both streaming ceilings.
    #[must_use]
    pub const fn with_stream_timeouts(mut self, websocket_ms: u64, sse_ms: u64) -> Self {
        self.websocket_timeout_ms = websocket_ms;
        self.sse_timeout_ms = sse_ms;
        self
    }

    /// Sets the SSE event limit.
    #[must_use]
    pub const fn with_sse_max_events(mut self, max_events: usize) -> Self {
        self.sse_max_events = max_events;
        self
    }

    /// Sets the TLS material.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.timeout_ms, 15_000);
        assert!(!settings.with_credentials);
        assert_eq!(settings.websocket_timeout_ms, 6_000);
        assert_eq!(settings.sse_timeout_ms, 6_000);
        assert_eq!(settings.sse_max_events, 8);
        assert_eq!(settings.history_limit, 50);
    }

    #[test]
    fn test_timeout_is_clamped() {
        assert_eq!(EngineSettings::default().with_timeout_ms(0).effective_timeout_ms(), 1);
        assert_eq!(
            EngineSettings::default().with_timeout_ms(900_000).effective_timeout_ms(),
            300_000
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{"withCredentials": true, "sseMaxEvents": 3}"#).unwrap();
        assert!(settings.with_credentials);
        assert_eq!(settings.sse_max_events, 3);
        assert_eq!(settings.timeout_ms, 15_000);
    }
}
