//! Patient domain model.
//!
//! # Responsibility
//! - Define the stored `Patient` record and the `PatientDraft` write shape.
//! - Validate field constraints before any persistence happens.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused for another patient.
//! - `name` and `address` are never blank.
//! - `birth_year` lies within `[MIN_BIRTH_YEAR, MAX_BIRTH_YEAR]`.
//! - `(name, birth_year)` is unique across the store (enforced by the repo).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned patient identifier.
pub type PatientId = i64;

/// Lowest accepted birth year (inclusive).
pub const MIN_BIRTH_YEAR: i32 = 1900;
/// Highest accepted birth year (inclusive).
pub const MAX_BIRTH_YEAR: i32 = 2025;
/// Upper bound on `name` length in characters; the name is part of the
/// composite unique index key.
pub const MAX_NAME_CHARS: usize = 450;

/// Persisted patient record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub address: String,
    pub birth_year: i32,
}

/// Caller-supplied fields for create and update.
///
/// Used as the request body by the HTTP layer, so every field is required
/// at the serde level as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDraft {
    pub name: String,
    pub address: String,
    pub birth_year: i32,
}

/// Validation errors for patient field constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatientValidationError {
    EmptyName,
    NameTooLong { max: usize, actual: usize },
    EmptyAddress,
    /// Text fields must not contain NUL; SQLite string functions stop at it.
    ContainsNul { field: &'static str },
    BirthYearOutOfRange { value: i32, min: i32, max: i32 },
    /// A schema CHECK constraint rejected the row.
    RejectedByStore(String),
}

impl Display for PatientValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::NameTooLong { max, actual } => {
                write!(f, "name must be at most {max} characters, got {actual}")
            }
            Self::EmptyAddress => write!(f, "address must not be empty"),
            Self::ContainsNul { field } => write!(f, "{field} must not contain NUL characters"),
            Self::BirthYearOutOfRange { value, min, max } => write!(
                f,
                "birth_year must be between {min} and {max} (inclusive), got {value}"
            ),
            Self::RejectedByStore(message) => write!(f, "rejected by storage: {message}"),
        }
    }
}

impl Error for PatientValidationError {}

impl PatientDraft {
    pub fn new(name: impl Into<String>, address: impl Into<String>, birth_year: i32) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            birth_year,
        }
    }

    /// Checks all field constraints.
    ///
    /// Uniqueness of `(name, birth_year)` is not checked here because it
    /// depends on stored state.
    ///
    /// # Errors
    /// - Returns the first violated constraint, checked in field order.
    pub fn validate(&self) -> Result<(), PatientValidationError> {
        validate_fields(&self.name, &self.address, self.birth_year)
    }

    /// Attaches a store-assigned ID.
    pub fn into_patient(self, id: PatientId) -> Patient {
        Patient {
            id,
            name: self.name,
            address: self.address,
            birth_year: self.birth_year,
        }
    }
}

impl Patient {
    /// Re-checks field constraints on a record loaded from storage.
    pub fn validate(&self) -> Result<(), PatientValidationError> {
        validate_fields(&self.name, &self.address, self.birth_year)
    }
}

fn validate_fields(name: &str, address: &str, birth_year: i32) -> Result<(), PatientValidationError> {
    if name.trim().is_empty() {
        return Err(PatientValidationError::EmptyName);
    }
    if name.contains('\0') {
        return Err(PatientValidationError::ContainsNul { field: "name" });
    }
    let name_chars = name.chars().count();
    if name_chars > MAX_NAME_CHARS {
        return Err(PatientValidationError::NameTooLong {
            max: MAX_NAME_CHARS,
            actual: name_chars,
        });
    }
    if address.trim().is_empty() {
        return Err(PatientValidationError::EmptyAddress);
    }
    if address.contains('\0') {
        return Err(PatientValidationError::ContainsNul { field: "address" });
    }
    if !(MIN_BIRTH_YEAR..=MAX_BIRTH_YEAR).contains(&birth_year) {
        return Err(PatientValidationError::BirthYearOutOfRange {
            value: birth_year,
            min: MIN_BIRTH_YEAR,
            max: MAX_BIRTH_YEAR,
        });
    }
    Ok(())
}
