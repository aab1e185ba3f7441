//! Authentication domain types

mod types;

pub use types::{ApiKeyLocation, AuthDescriptor};
