//! Protocol dispatcher
//!
//! Runs one send through resolution, auth injection, the pre-request script,
//! the per-protocol sender and the test script, then hands the exchange to
//! the history recorder.

mod normalize;
mod send_request;
mod stream;

pub use normalize::{normalize_http, streaming_failure};
pub(crate) use send_request::InFlightGuard;
pub use send_request::{SendError, SendRequest};
pub use stream::{FinishReason, StreamCollector, StreamLimits};
