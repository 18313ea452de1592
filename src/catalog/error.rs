//! Catalog error types

use thiserror::Error;

/// Error type for catalog lookups
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// No record with this id
    #[error("cat not found: {0}")]
    NotFound(String),
}

/// Why a record was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Breed or url missing
    MissingField,
    /// Same url, or same breed and info, as a stored record
    Duplicate,
    /// The supplied id already belongs to a stored record
    DuplicateId,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::MissingField => write!(f, "missing breed or url"),
            Rejection::Duplicate => write!(f, "duplicate"),
            Rejection::DuplicateId => write!(f, "duplicate id"),
        }
    }
}
