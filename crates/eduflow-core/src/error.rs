//! Domain errors
//!
//! Every failure a caller can observe maps to exactly one variant here, and
//! each variant renders its own human-readable message. Storage faults are
//! wrapped rather than flattened so the CLI can still offer recovery hints.

use chrono::NaiveDate;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by `Store` operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// A create collided with an existing primary key
    #[error("{kind} '{key}' already exists")]
    DuplicateKey { kind: &'static str, key: String },

    /// An update or delete named a key that is not present
    #[error("{kind} '{key}' not found")]
    NotFound { kind: &'static str, key: String },

    /// Attendance write outside the editable window
    #[error(
        "Attendance for {date} is frozen: it is {elapsed_days} day(s) away and records older than {window_days} day(s) are read-only"
    )]
    FrozenRecord {
        date: NaiveDate,
        elapsed_days: i64,
        window_days: i64,
    },

    /// Timetable requested for a semester with no subjects
    #[error("No subjects found for department '{dept}' semester {semester}")]
    NoSubjectsAvailable { dept: String, semester: u8 },

    /// Credentials did not match any user
    #[error("Invalid credentials")]
    AuthFailure,

    /// A field value was rejected before touching any table
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The durable flush failed; in-memory changes were rolled back
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CoreError {
    pub(crate) fn duplicate(kind: &'static str, key: impl ToString) -> Self {
        CoreError::DuplicateKey {
            kind,
            key: key.to_string(),
        }
    }

    pub(crate) fn not_found(kind: &'static str, key: impl ToString) -> Self {
        CoreError::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CoreError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// True when the caller can fix the problem by changing its input
    pub fn is_user_error(&self) -> bool {
        !matches!(self, CoreError::Storage(_))
    }
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
