//! Normalized response types shared by every protocol.

mod event;
mod normalized;
mod outcome;

pub use event::EventRecord;
pub use normalized::{HeaderValue, NormalizedResponse, render_data};
pub use outcome::DispatchOutcome;
