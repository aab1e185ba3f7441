//! Port adapters
//!
//! Concrete implementations of the application ports: network transports,
//! the history store and the system clock.

mod memory_history;
mod reqwest_transport;
pub mod sse_parser;
mod stream_transport;
mod system_clock;

pub use memory_history::InMemoryHistory;
pub use reqwest_transport::ReqwestHttpTransport;
pub use sse_parser::{SseMessage, SseParser};
pub use stream_transport::NetworkStreamTransport;
pub use system_clock::SystemClock;
