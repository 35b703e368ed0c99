//! Required-field policy for the structured edit path.

use crate::paper::PaperRecord;
use serde::{Deserialize, Serialize};

/// Earliest publication year the edit path accepts.
pub const YEAR_MIN: i32 = 1900;
/// Latest publication year the edit path accepts.
pub const YEAR_MAX: i32 = 2030;

/// A single rejected field with the reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a record against the edit policy.
///
/// Returns every offending field; an empty vector means the record passes.
pub fn validate_record(record: &PaperRecord) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if record.title.trim().is_empty() {
        errors.push(FieldError::new("title", "title is required"));
    }

    if record.authors.iter().all(|a| a.trim().is_empty()) {
        errors.push(FieldError::new("authors", "at least one author is required"));
    }

    if record.venue.trim().is_empty() {
        errors.push(FieldError::new("venue", "venue is required"));
    }

    if record.year < YEAR_MIN || record.year > YEAR_MAX {
        errors.push(FieldError::new(
            "year",
            format!("year must be between {} and {}", YEAR_MIN, YEAR_MAX),
        ));
    }

    errors
}
