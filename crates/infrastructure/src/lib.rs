//! Courier Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer: the reqwest HTTP transport, the
//! WebSocket and SSE stream transport, the script sandbox, the in-memory
//! history store, the system clock and the settings loader.

pub mod adapters;
pub mod config;
pub mod scripting;
pub mod serialization;

pub use adapters::{
    InMemoryHistory, NetworkStreamTransport, ReqwestHttpTransport, SseMessage, SseParser,
    SystemClock,
};
pub use config::{ConfigError, SettingsLoader};
pub use scripting::{SandboxScriptEngine, ScriptError};
pub use serialization::{SerializationError, from_json, read_json_file, to_json_pretty};
