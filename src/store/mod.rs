//! Record persistence on top of a single SQLite connection.
//!
//! Every function takes a borrowed connection and performs one unit of work.
//! Soft-deleted rows stay in their tables: lookups by id still find them,
//! listings skip them, and the partial unique indexes ignore them.

pub mod marks;
pub mod students;
pub mod subjects;

use chrono::{SecondsFormat, Utc};

use crate::error::ApiError;

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Maps a write failure, turning the duplicate-key signal into `Conflict`.
pub(crate) fn write_error(e: rusqlite::Error, duplicate_message: &str) -> ApiError {
    if is_unique_violation(&e) {
        ApiError::Conflict(duplicate_message.to_string())
    } else {
        ApiError::from(e)
    }
}
