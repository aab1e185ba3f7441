//! Application error types

use courier_domain::DomainError;
use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// The requested environment does not exist.
    #[error("environment not found: {0}")]
    EnvironmentNotFound(String),

    /// An environment with the same id already exists.
    #[error("environment already exists: {0}")]
    DuplicateEnvironment(String),
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
