//! Request drafts and their resolved form.

mod draft;
mod method;
mod pair;
mod resolved;

pub use draft::{BodyMode, HeaderMap, Protocol, RequestDraft};
pub use method::HttpMethod;
pub use pair::KeyValue;
pub use resolved::ResolvedRequest;
