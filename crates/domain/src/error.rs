//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// The protocol name is not one of http, graphql, websocket or sse.
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// The body mode name is unknown.
    #[error("unsupported body mode: {0}")]
    UnsupportedBodyMode(String),

    /// An identifier is invalid or empty.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
