//! ID generation utilities.

use uuid::Uuid;

/// Generates a new time-ordered identifier (UUID v7) as a string.
///
/// Used for exchange records, event records and environments.
#[must_use]
pub fn generate_id() -> String {
    Uuid::now_v7().to_string()
}
