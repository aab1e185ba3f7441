//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the dispatch engine and external systems.
//! Each port is a trait implemented by an adapter in the infrastructure layer.

mod cancellation;
mod clock;
mod history;
mod http_transport;
mod script_engine;
mod stream_transport;

pub use cancellation::{CancellationReceiver, CancellationToken};
pub use clock::Clock;
pub use history::HistoryRecorder;
pub use http_transport::{HttpClientError, HttpTransport, TransportRequest, TransportResponse};
pub use script_engine::ScriptEngine;
pub use stream_transport::{StreamError, StreamEvent, StreamSubscription, StreamTransport};
