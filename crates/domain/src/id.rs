//! ID generation utilities.

use uuid::Uuid;

/// Generates a new time-ordered identifier as a string.
///
/// This is the standard ID format for every persisted HTTPulse record.
#[must_use]
pub fn generate_id() -> String {
    Uuid::now_v7().to_string()
}
