//! Cat record type
//!
//! A record starts life as a candidate produced by a source and becomes a
//! catalog entry once admitted. Admitted records are immutable and shared as
//! `Arc<CatRecord>`.

use serde::{Deserialize, Serialize};

/// A single cat listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatRecord {
    /// Globally unique id (assigned at admission when the source left it empty)
    #[serde(default)]
    pub id: String,

    /// Tag naming where the record came from (e.g. "rescueme")
    #[serde(default)]
    pub source: String,

    /// Listing image URL; the exact-identity dedup axis
    #[serde(default)]
    pub url: String,

    /// Breed as published by the source
    #[serde(default)]
    pub breed: String,

    /// Free text description
    #[serde(default)]
    pub info: String,

    /// Admission time in epoch milliseconds
    #[serde(default)]
    pub fetched_at: i64,
}

impl CatRecord {
    /// Create a candidate without id or admission time
    pub fn candidate(
        source: impl Into<String>,
        url: impl Into<String>,
        breed: impl Into<String>,
        info: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            source: source.into(),
            url: url.into(),
            breed: breed.into(),
            info: info.into(),
            fetched_at: 0,
        }
    }

    /// Set a source-supplied id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Whether the record carries both a breed and a url.
    ///
    /// Whitespace-only values count as missing.
    pub fn is_admissible(&self) -> bool {
        !self.breed.trim().is_empty() && !self.url.trim().is_empty()
    }

    /// Breed lower-cased for case-insensitive matching
    pub fn normalized_breed(&self) -> String {
        self.breed.to_lowercase()
    }
}
