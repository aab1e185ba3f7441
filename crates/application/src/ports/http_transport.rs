//! HTTP transport port
//!
//! The single `perform_http` capability the dispatcher needs to put bytes on
//! the wire, whether through a direct network call or a privileged host.

use async_trait::async_trait;
use courier_domain::{HeaderMap, HttpMethod, TlsConfig};
use thiserror::Error;

use crate::payload::RequestPayload;

/// A fully materialized request handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// Final URL, query parameters included.
    pub url: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Headers to send, in order.
    pub headers: HeaderMap,
    /// Encoded body.
    pub payload: RequestPayload,
    /// Timeout for the whole exchange.
    pub timeout_ms: u64,
    /// TLS material; when it names any certificate the cookie-aware client is not used.
    pub tls: Option<TlsConfig>,
    /// Whether to use the cookie-aware client.
    pub with_credentials: bool,
}

/// What the transport received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase.
    pub status_text: String,
    /// Response headers in arrival order; repeated names appear repeatedly.
    pub headers: Vec<(String, String)>,
    /// Raw body bytes.
    pub body: Vec<u8>,
    /// Time spent in the transport.
    pub duration_ms: u64,
}

impl TransportResponse {
    /// Returns every value of a header, matched case-insensitively.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

/// Errors reported by the HTTP transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpClientError {
    /// The URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The exchange took longer than the timeout.
    #[error("timeout of {timeout_ms}ms exceeded")]
    Timeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// The host name could not be resolved.
    #[error("DNS lookup failed for {host}: {message}")]
    DnsError {
        /// Host that failed to resolve.
        host: String,
        /// Resolver message.
        message: String,
    },

    /// The server refused the connection.
    #[error("connection refused: {host}:{port}")]
    ConnectionRefused {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
    },

    /// The connection failed for another reason.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS material could not be loaded or the handshake failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The redirect limit was reached.
    #[error("too many redirects (max {max})")]
    TooManyRedirects {
        /// Redirect limit.
        max: usize,
    },

    /// The body could not be built.
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),

    /// The send was cancelled by its token.
    #[error("request cancelled")]
    Cancelled,
}

/// Port for performing HTTP exchanges.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs one exchange.
    ///
    /// # Errors
    ///
    /// Returns an [`HttpClientError`] when no response was received. A 4xx or
    /// 5xx response is not an error.
    async fn perform_http(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, HttpClientError>;
}
