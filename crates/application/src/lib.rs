//! Courier Application - Resolution, auth injection and dispatch
//!
//! This crate defines the application layer with:
//! - Port traits for the transports, the script sandbox, history and time
//! - The variable resolver and the auth injector
//! - The session state aggregate
//! - The protocol dispatcher and the bulk runner

pub mod auth;
pub mod bulk;
pub mod dispatcher;
pub mod error;
pub mod headers;
pub mod payload;
pub mod ports;
pub mod session;
pub mod url_builder;
pub mod variable_resolver;

pub use auth::{AuthApplied, apply_auth};
pub use bulk::{BulkItem, BulkResult, BulkRunner};
pub use dispatcher::{SendError, SendRequest, StreamCollector};
pub use error::{ApplicationError, ApplicationResult};
pub use payload::{RequestPayload, encode_payload};
pub use ports::{
    CancellationReceiver, CancellationToken, Clock, HistoryRecorder, HttpClientError,
    HttpTransport, ScriptEngine, StreamError, StreamEvent, StreamSubscription, StreamTransport,
    TransportRequest, TransportResponse,
};
pub use session::SessionState;
pub use url_builder::{build_url_with_params, hostname_of};
pub use variable_resolver::{VariableResolver, merge_variables};
