//! Auth injection
//!
//! Turns an [`AuthDescriptor`](courier_domain::AuthDescriptor) into header
//! and query additions. Credential fields are used as given; placeholders in
//! them are not substituted here.

mod injector;

pub use injector::{AuthApplied, apply_auth};
