//! JSON file helpers for drafts, environments and exchange records.

mod json;

pub use json::{SerializationError, from_json, read_json_file, to_json_pretty};
