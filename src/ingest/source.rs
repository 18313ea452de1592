//! Candidate sources
//!
//! A source produces candidate records on request. The contract is
//! best-effort: it may return fewer than asked, and a failure is never fatal
//! to ingestion.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use thiserror::Error;

use crate::catalog::CatRecord;

/// Error type for candidate fetches
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// One endpoint could not be fetched or parsed
    #[error("fetch from {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    /// Every configured endpoint failed
    #[error("all {0} source endpoints failed")]
    AllFailed(usize),

    /// The fetch did not finish in time
    #[error("source fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The source could not be constructed
    #[error("source setup failed: {0}")]
    Setup(String),
}

/// Producer of candidate records
pub trait CandidateSource: Send + Sync + 'static {
    /// Fetch up to `total` candidates, taking at most `per_source` from each
    /// sub-source
    fn fetch_candidates(
        &self,
        total: usize,
        per_source: usize,
    ) -> impl Future<Output = Result<Vec<CatRecord>, SourceError>> + Send;
}

/// Accumulates one batch across sub-sources
///
/// Applies the per sub-source cap, the total cap, and drops candidates whose
/// id or url already appeared in this batch.
#[derive(Debug)]
pub(crate) struct Batch {
    total: usize,
    ids: HashSet<String>,
    urls: HashSet<String>,
    records: Vec<CatRecord>,
}

impl Batch {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            ids: HashSet::new(),
            urls: HashSet::new(),
            records: Vec::new(),
        }
    }

    /// Whether the batch reached its total
    pub(crate) fn is_full(&self) -> bool {
        self.records.len() >= self.total
    }

    /// Add the first `per_source` candidates of one sub-source
    pub(crate) fn extend_from(&mut self, group: impl IntoIterator<Item = CatRecord>, per_source: usize) {
        for record in group.into_iter().take(per_source) {
            if self.is_full() {
                break;
            }

            let seen_id = !record.id.is_empty() && self.ids.contains(&record.id);
            let seen_url = !record.url.is_empty() && self.urls.contains(&record.url);
            if seen_id || seen_url {
                continue;
            }

            if !record.id.is_empty() {
                self.ids.insert(record.id.clone());
            }
            if !record.url.is_empty() {
                self.urls.insert(record.url.clone());
            }
            self.records.push(record);
        }
    }

    pub(crate) fn into_records(self) -> Vec<CatRecord> {
        self.records
    }
}

/// In-memory source with a fixed set of sub-sources
///
/// Every fetch returns clones of the same candidates, which makes it handy
/// for demos and for exercising dedup.
#[derive(Debug, Default)]
pub struct StaticSource {
    groups: Vec<Vec<CatRecord>>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl StaticSource {
    /// Single sub-source holding `records`
    pub fn new(records: Vec<CatRecord>) -> Self {
        Self::with_groups(vec![records])
    }

    /// One sub-source per group
    pub fn with_groups(groups: Vec<Vec<CatRecord>>) -> Self {
        Self {
            groups,
            delay: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Sleep this long before answering each fetch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl CandidateSource for StaticSource {
    async fn fetch_candidates(
        &self,
        total: usize,
        per_source: usize,
    ) -> Result<Vec<CatRecord>, SourceError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut batch = Batch::new(total);
        for group in &self.groups {
            if batch.is_full() {
                break;
            }
            batch.extend_from(group.iter().cloned(), per_source);
        }

        Ok(batch.into_records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(id: &str, url: &str) -> CatRecord {
        CatRecord::candidate("test", url, "Tabby", "").with_id(id)
    }

    #[test]
    fn test_batch_caps_and_dedups() {
        let mut batch = Batch::new(3);

        batch.extend_from(vec![cat("1", "u1"), cat("1", "u9"), cat("2", "u2")], 2);
        // "1" seen again: skipped; cap of 2 reached after looking at two items
        assert_eq!(batch.records.len(), 1);

        batch.extend_from(vec![cat("3", "u1"), cat("4", "u4"), cat("5", "u5"), cat("6", "u6")], 5);
        let ids: Vec<_> = batch.into_records().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, ["1", "4", "5"]);
    }

    #[tokio::test]
    async fn test_static_source_applies_caps() {
        let source = StaticSource::with_groups(vec![
            (0..5).map(|i| cat(&format!("a{}", i), &format!("a/{}", i))).collect(),
            (0..5).map(|i| cat(&format!("b{}", i), &format!("b/{}", i))).collect(),
        ]);

        let batch = source.fetch_candidates(4, 3).await.unwrap();
        let ids: Vec<_> = batch.iter().map(|c| c.id.as_str()).collect();

        assert_eq!(ids, ["a0", "a1", "a2", "b0"]);
        assert_eq!(source.fetch_count(), 1);
    }
}
