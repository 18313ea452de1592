//! Append-only record catalog
//!
//! The catalog owns every admitted [`CatRecord`] for the lifetime of the
//! process. Admission validates the record, rejects duplicates on two axes
//! and assigns an id:
//!
//! ```text
//!   candidate ──► is_admissible? ──► is_duplicate? ──► assign id ──► push
//!                    │ no               │ yes
//!                    ▼                  ▼
//!              MissingField         Duplicate
//! ```
//!
//! Duplicates are records with the same non-empty url, or with the same breed
//! and the same non-empty info (both compared case-insensitively).

pub mod error;
pub mod record;
pub mod store;

pub use error::{CatalogError, Rejection};
pub use record::CatRecord;
pub use store::{Admission, Catalog};
