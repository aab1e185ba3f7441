//! Exchange records handed to the history recorder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::environment::EnvironmentVariableSet;
use crate::id::generate_id;
use crate::request::{Protocol, ResolvedRequest};
use crate::response::NormalizedResponse;

/// One completed send: the resolved request and the response it produced.
///
/// Created once per completed send and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRecord {
    /// Unique id of the exchange.
    pub id: String,
    /// When the exchange finished.
    pub timestamp: DateTime<Utc>,
    /// Protocol of the request.
    pub protocol: Protocol,
    /// Snapshot of the resolved request.
    pub request: ResolvedRequest,
    /// The normalized response, assertions included.
    pub response: NormalizedResponse,
    /// Active environment at send time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    /// Name of the active environment at send time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_name: Option<String>,
}

impl ExchangeRecord {
    /// Creates a record with a fresh id.
    #[must_use]
    pub fn new(
        request: ResolvedRequest,
        response: NormalizedResponse,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_id(),
            timestamp,
            protocol: request.protocol,
            request,
            response,
            environment_id: None,
            environment_name: None,
        }
    }

    /// Tags the record with the environment that was active.
    #[must_use]
    pub fn with_environment(mut self, environment: Option<&EnvironmentVariableSet>) -> Self {
        self.environment_id = environment.map(|env| env.id.clone());
        self.environment_name = environment.map(|env| env.name.clone());
        self
    }
}
