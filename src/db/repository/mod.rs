//! Repository layer — entity-scoped database operations.
//!
//! Plain functions over a borrowed `rusqlite::Connection`; callers own the
//! connection and its lifetime.

mod medication;
mod patient;
mod prescription;

pub use medication::*;
pub use patient::*;
pub use prescription::*;

/// Trims and turns blank strings into `None`.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
