//! Courier Domain - Core business types
//!
//! This crate defines the data model of the Courier request engine:
//! request drafts, variable sets, auth descriptors, the cookie store,
//! normalized responses and exchange records.
//! All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod cookie;
pub mod environment;
pub mod error;
pub mod history;
pub mod id;
pub mod request;
pub mod response;
pub mod scripting;
pub mod settings;
pub mod state;
pub mod testing;
pub mod tls;

pub use auth::{ApiKeyLocation, AuthDescriptor};
pub use cookie::{CookieJar, CookieStore, build_cookie_header, parse_set_cookies};
pub use environment::{EnvironmentVariableSet, GlobalVariableSet, VariableMap};
pub use error::{DomainError, DomainResult};
pub use history::ExchangeRecord;
pub use id::generate_id;
pub use request::{
    BodyMode, HeaderMap, HttpMethod, KeyValue, Protocol, RequestDraft, ResolvedRequest,
};
pub use response::{DispatchOutcome, EventRecord, HeaderValue, NormalizedResponse};
pub use scripting::{PreRequestContext, PreRequestOutcome};
pub use settings::EngineSettings;
pub use state::SendPhase;
pub use testing::AssertionResult;
pub use tls::TlsConfig;
