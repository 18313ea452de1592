//! Catalog implementation
//!
//! Append-only record log with hash indexes for id lookup and both dedup
//! axes (exact url, case-insensitive breed + info).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::{CatalogError, Rejection};
use super::record::CatRecord;

/// Outcome of [`Catalog::append`]
#[derive(Debug, Clone)]
pub enum Admission {
    /// The record was stored; this is the stored copy
    Admitted(Arc<CatRecord>),
    /// The record was not stored
    Rejected(Rejection),
}

impl Admission {
    /// Whether the record was stored
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }

    /// The stored record, if admitted
    pub fn record(&self) -> Option<&Arc<CatRecord>> {
        match self {
            Admission::Admitted(record) => Some(record),
            Admission::Rejected(_) => None,
        }
    }
}

#[derive(Default)]
struct CatalogInner {
    /// Records in admission order
    records: Vec<Arc<CatRecord>>,

    /// id -> position in `records`
    by_id: HashMap<String, usize>,

    /// Non-empty urls of stored records
    urls: HashSet<String>,

    /// (lower-cased breed, lower-cased info) for records with non-empty info
    breed_info: HashSet<(String, String)>,
}

impl CatalogInner {
    fn is_duplicate(&self, candidate: &CatRecord) -> bool {
        if !candidate.url.is_empty() && self.urls.contains(&candidate.url) {
            return true;
        }

        match content_key(candidate) {
            Some(key) => self.breed_info.contains(&key),
            None => false,
        }
    }
}

/// Dedup key for the fuzzy axis; `None` when breed or info is empty
fn content_key(record: &CatRecord) -> Option<(String, String)> {
    if record.breed.is_empty() || record.info.is_empty() {
        return None;
    }
    Some((record.breed.to_lowercase(), record.info.to_lowercase()))
}

/// Append-only in-memory catalog of admitted records
///
/// `append` is the only mutator. Readers clone `Arc`s out under the read
/// lock, so they never observe a partially inserted record.
#[derive(Default)]
pub struct Catalog {
    inner: RwLock<CatalogInner>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate, dedup and store a record
    ///
    /// Assigns an id when the record has none and stamps `fetched_at`.
    pub async fn append(&self, mut record: CatRecord) -> Admission {
        if !record.is_admissible() {
            return Admission::Rejected(Rejection::MissingField);
        }

        let mut inner = self.inner.write().await;

        if inner.is_duplicate(&record) {
            return Admission::Rejected(Rejection::Duplicate);
        }

        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        } else if inner.by_id.contains_key(&record.id) {
            return Admission::Rejected(Rejection::DuplicateId);
        }
        record.fetched_at = chrono::Utc::now().timestamp_millis();

        if !record.url.is_empty() {
            inner.urls.insert(record.url.clone());
        }
        if let Some(key) = content_key(&record) {
            inner.breed_info.insert(key);
        }

        let position = inner.records.len();
        inner.by_id.insert(record.id.clone(), position);

        let record = Arc::new(record);
        inner.records.push(Arc::clone(&record));

        tracing::debug!(
            id = %record.id,
            breed = %record.breed,
            size = inner.records.len(),
            "Record admitted"
        );

        Admission::Admitted(record)
    }

    /// Check a candidate against every stored record
    pub async fn is_duplicate(&self, candidate: &CatRecord) -> bool {
        self.inner.read().await.is_duplicate(candidate)
    }

    /// Snapshot of all records in admission order
    pub async fn list(&self) -> Vec<Arc<CatRecord>> {
        self.inner.read().await.records.clone()
    }

    /// Look up a record by id
    pub async fn get(&self, id: &str) -> Result<Arc<CatRecord>, CatalogError> {
        let inner = self.inner.read().await;
        inner
            .by_id
            .get(id)
            .and_then(|&position| inner.records.get(position))
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Whether the catalog holds no records
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_err;

    use super::*;

    fn cat(breed: &str, url: &str, info: &str) -> CatRecord {
        CatRecord::candidate("test", url, breed, info)
    }

    #[tokio::test]
    async fn test_tabby_dedup_scenario() {
        let catalog = Catalog::new();

        let first = catalog.append(cat("Tabby", "http://a/1", "friendly")).await;
        assert!(first.is_admitted());
        assert_eq!(catalog.len().await, 1);

        // Same breed and info, ignoring case
        let second = catalog
            .append(cat("tabby", "http://other/2", "Friendly"))
            .await;
        assert!(matches!(second, Admission::Rejected(Rejection::Duplicate)));
        assert_eq!(catalog.len().await, 1);

        // Same url
        let third = catalog
            .append(cat("Tabby", "http://a/1", "different text"))
            .await;
        assert!(matches!(third, Admission::Rejected(Rejection::Duplicate)));
        assert_eq!(catalog.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_fields_never_mutate() {
        let catalog = Catalog::new();

        for record in [
            cat("", "http://a/1", "x"),
            cat("Tabby", "", "x"),
            cat("  ", "http://a/2", "x"),
        ] {
            let result = catalog.append(record).await;
            assert!(matches!(
                result,
                Admission::Rejected(Rejection::MissingField)
            ));
        }

        assert!(catalog.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_info_never_matches() {
        let catalog = Catalog::new();

        assert!(catalog.append(cat("Tabby", "http://a/1", "")).await.is_admitted());
        // Same breed, both infos empty, different url: not a duplicate
        assert!(catalog.append(cat("Tabby", "http://a/2", "")).await.is_admitted());
        assert_eq!(catalog.len().await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_appends_never_grow() {
        let catalog = Catalog::new();
        let originals = [
            cat("Siamese", "http://a/1", "blue eyes"),
            cat("Persian", "http://a/2", "fluffy"),
            cat("Tabby", "http://a/3", ""),
        ];
        for record in originals.iter().cloned() {
            assert!(catalog.append(record).await.is_admitted());
        }

        let duplicates = [
            cat("Other", "http://a/1", "whatever"),
            cat("PERSIAN", "http://b/2", "FLUFFY"),
            cat("siamese", "http://b/3", "Blue Eyes"),
            cat("Tabby", "http://a/3", "now with info"),
        ];
        for record in duplicates {
            assert!(catalog.is_duplicate(&record).await);
            assert!(!catalog.append(record).await.is_admitted());
            assert_eq!(catalog.len().await, 3);
        }
    }

    #[tokio::test]
    async fn test_assigns_id_and_timestamp() {
        let catalog = Catalog::new();

        let admitted = catalog.append(cat("Tabby", "http://a/1", "")).await;
        let record = admitted.record().unwrap();

        assert!(!record.id.is_empty());
        assert!(record.fetched_at > 0);

        let fetched = catalog.get(&record.id).await.unwrap();
        assert_eq!(fetched, *record);
    }

    #[tokio::test]
    async fn test_keeps_supplied_id_and_rejects_reuse() {
        let catalog = Catalog::new();

        let first = catalog
            .append(cat("Tabby", "http://a/1", "").with_id("rescueme-1"))
            .await;
        assert_eq!(first.record().unwrap().id, "rescueme-1");

        let reused = catalog
            .append(cat("Persian", "http://a/2", "").with_id("rescueme-1"))
            .await;
        assert!(matches!(reused, Admission::Rejected(Rejection::DuplicateId)));
        assert_eq!(catalog.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_unknown_id() {
        let catalog = Catalog::new();

        let result = catalog.get("missing").await;
        assert_err!(&result);
        assert_eq!(result, Err(CatalogError::NotFound("missing".to_string())));
    }

    #[tokio::test]
    async fn test_list_preserves_order_and_is_a_snapshot() {
        let catalog = Catalog::new();
        catalog.append(cat("A", "http://a/1", "")).await;
        catalog.append(cat("B", "http://a/2", "")).await;

        let snapshot = catalog.list().await;
        catalog.append(cat("C", "http://a/3", "")).await;

        let breeds: Vec<_> = snapshot.iter().map(|c| c.breed.as_str()).collect();
        assert_eq!(breeds, ["A", "B"]);
        assert_eq!(catalog.list().await.len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_appends_of_same_url_admit_once() {
        let catalog = Arc::new(Catalog::new());

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let catalog = Arc::clone(&catalog);
                tokio::spawn(async move {
                    catalog
                        .append(cat("Tabby", "http://same/1", &format!("info {}", i)))
                        .await
                        .is_admitted()
                })
            })
            .collect();

        let mut admitted = 0;
        for task in tasks {
            if task.await.unwrap() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(catalog.len().await, 1);
    }
}
