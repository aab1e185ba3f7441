//! The user-edited request draft.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::auth::AuthDescriptor;
use crate::error::{DomainError, DomainResult};

use super::{HttpMethod, KeyValue};

/// Materialized header map: insertion ordered, last write wins.
pub type HeaderMap = IndexMap<String, String>;

/// Transport family of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP request.
    #[default]
    Http,
    /// GraphQL over HTTP POST.
    Graphql,
    /// WebSocket session.
    Websocket,
    /// Server-Sent Events subscription.
    Sse,
}

impl Protocol {
    /// Returns true for the protocols that collect a stream of events.
    #[must_use]
    pub const fn is_streaming(self) -> bool {
        matches!(self, Self::Websocket | Self::Sse)
    }

    /// Returns the wire name of the protocol.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Graphql => "graphql",
            Self::Websocket => "websocket",
            Self::Sse => "sse",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "graphql" => Ok(Self::Graphql),
            "websocket" | "ws" => Ok(Self::Websocket),
            "sse" => Ok(Self::Sse),
            other => Err(DomainError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// How the draft body is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum BodyMode {
    /// JSON text, parsed before sending when possible.
    #[default]
    Json,
    /// XML text sent as-is.
    Xml,
    /// Arbitrary text sent as-is.
    Raw,
    /// `multipart/form-data` built from form fields.
    FormData,
    /// `application/x-www-form-urlencoded` built from url-encoded pairs.
    Urlencoded,
}

impl BodyMode {
    /// Content type implied by the mode, if the mode implies one.
    ///
    /// Multipart bodies get their boundary from the transport.
    #[must_use]
    pub const fn content_type(self) -> Option<&'static str> {
        match self {
            Self::Json => Some("application/json"),
            Self::Xml => Some("application/xml"),
            Self::Raw => Some("text/plain"),
            Self::Urlencoded => Some("application/x-www-form-urlencoded"),
            Self::FormData => None,
        }
    }
}

impl FromStr for BodyMode {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s.trim() {
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            "raw" => Ok(Self::Raw),
            "formData" | "form-data" => Ok(Self::FormData),
            "urlencoded" | "x-www-form-urlencoded" => Ok(Self::Urlencoded),
            other => Err(DomainError::UnsupportedBodyMode(other.to_string())),
        }
    }
}

/// A request as edited by the user, before variable resolution.
///
/// Every string field may contain `{{name}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestDraft {
    /// Transport family.
    pub protocol: Protocol,
    /// HTTP method; ignored for WebSocket and SSE.
    pub method: HttpMethod,
    /// Target URL template.
    pub url: String,
    /// Header rows.
    pub headers: Vec<KeyValue>,
    /// Query parameter rows.
    pub params: Vec<KeyValue>,
    /// Rows for `urlencoded` bodies.
    #[serde(alias = "urlEncodedPairs")]
    pub url_encoded: Vec<KeyValue>,
    /// Rows for `formData` bodies.
    #[serde(alias = "formFields")]
    pub form_data: Vec<KeyValue>,
    /// Raw body text.
    pub body: String,
    /// Body encoding.
    pub body_mode: BodyMode,
    /// GraphQL document.
    pub graphql_query: String,
    /// GraphQL variables as JSON text.
    pub graphql_variables: String,
    /// Authentication descriptor.
    pub auth: AuthDescriptor,
    /// Script run before sending.
    pub pre_request_script: String,
    /// Script run against the response.
    pub test_script: String,
}

impl RequestDraft {
    /// Creates an HTTP GET draft for the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the protocol.
    #[must_use]
    pub const fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Sets the HTTP method.
    #[must_use]
    pub const fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Appends a header row.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(KeyValue::new(key, value));
        self
    }

    /// Appends a query parameter row.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(KeyValue::new(key, value));
        self
    }

    /// Appends a url-encoded body row.
    #[must_use]
    pub fn with_url_encoded(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.url_encoded.push(KeyValue::new(key, value));
        self
    }

    /// Appends a form-data row.
    #[must_use]
    pub fn with_form_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_data.push(KeyValue::new(key, value));
        self
    }

    /// Sets the body text and mode.
    #[must_use]
    pub fn with_body(mut self, mode: BodyMode, body: impl Into<String>) -> Self {
        self.body_mode = mode;
        self.body = body.into();
        self
    }

    /// Sets the GraphQL query and variables text.
    #[must_use]
    pub fn with_graphql(mut self, query: impl Into<String>, variables: impl Into<String>) -> Self {
        self.graphql_query = query.into();
        self.graphql_variables = variables.into();
        self
    }

    /// Sets the auth descriptor.
    #[must_use]
    pub fn with_auth(mut self, auth: AuthDescriptor) -> Self {
        self.auth = auth;
        self
    }

    /// Sets the pre-request script.
    #[must_use]
    pub fn with_pre_request_script(mut self, script: impl Into<String>) -> Self {
        self.pre_request_script = script.into();
        self
    }

    /// Sets the test script.
    #[must_use]
    pub fn with_test_script(mut self, script: impl Into<String>) -> Self {
        self.test_script = script.into();
        self
    }

    /// Materializes header rows into a map.
    ///
    /// Rows with an empty key or value are dropped; later rows overwrite earlier ones.
    #[must_use]
    pub fn header_map(&self) -> HeaderMap {
        self.headers
            .iter()
            .filter(|row| row.is_complete())
            .map(|row| (row.key.clone(), row.value.clone()))
            .collect()
    }

    /// Returns the query parameter rows that will be sent, repetition preserved.
    #[must_use]
    pub fn active_params(&self) -> Vec<KeyValue> {
        self.params
            .iter()
            .filter(|row| row.is_complete())
            .cloned()
            .collect()
    }
}
