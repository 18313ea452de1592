//! Periodic ingestion
//!
//! The scheduler owns a pool of fetched-but-not-admitted candidates. The
//! source is only asked for a new batch when the pool is empty, and each tick
//! admits a small fixed quota from the front of the pool, so subscribers see
//! a steady trickle instead of one burst per fetch.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};

use crate::broadcast::BroadcastEngine;
use crate::catalog::{Admission, CatRecord, Catalog};
use crate::stats::{TickOutcome, TickReport};

use super::config::IngestConfig;
use super::source::{CandidateSource, SourceError};

/// Clears the running flag when a tick ends, however it ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Pulls candidates from a source and admits them on a fixed cadence
pub struct IngestionScheduler<S> {
    config: IngestConfig,
    catalog: Arc<Catalog>,
    engine: Arc<BroadcastEngine>,
    source: S,

    /// Deduplicated candidates waiting for admission, oldest first
    pool: Mutex<VecDeque<CatRecord>>,

    /// Set while a tick (or the seed) is running
    running: AtomicBool,
}

impl<S: CandidateSource> IngestionScheduler<S> {
    /// Create a scheduler with an empty pool
    pub fn new(
        config: IngestConfig,
        catalog: Arc<Catalog>,
        engine: Arc<BroadcastEngine>,
        source: S,
    ) -> Self {
        Self {
            config,
            catalog,
            engine,
            source,
            pool: Mutex::new(VecDeque::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Get the ingestion configuration
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Get the candidate source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Whether a tick is in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Number of candidates waiting in the pool
    pub async fn pool_size(&self) -> usize {
        self.pool.lock().await.len()
    }

    fn try_start(&self) -> Option<RunningGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunningGuard(&self.running))
    }

    /// Fetch a batch; failures and timeouts become an empty batch
    async fn fetch(&self, total: usize, per_source: usize) -> Vec<CatRecord> {
        let fetch = self.source.fetch_candidates(total, per_source);

        match tokio::time::timeout(self.config.fetch_timeout, fetch).await {
            Ok(Ok(batch)) => batch,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Source unavailable, treating as empty batch");
                Vec::new()
            }
            Err(_) => {
                let e = SourceError::Timeout(self.config.fetch_timeout);
                tracing::warn!(error = %e, "Source unavailable, treating as empty batch");
                Vec::new()
            }
        }
    }

    /// One-time startup pass: fetch, filter, and admit everything new
    ///
    /// Nothing is published; this runs before subscribers connect.
    pub async fn seed(&self) -> TickOutcome {
        let Some(_guard) = self.try_start() else {
            return TickOutcome::Skipped;
        };

        let mut report = TickReport {
            fetched_batch: true,
            ..TickReport::default()
        };

        let batch = self
            .fetch(self.config.seed_limit, self.config.seed_per_source)
            .await;
        report.fetched = batch.len();

        for candidate in batch.into_iter().filter(CatRecord::is_admissible) {
            report.valid += 1;
            match self.catalog.append(candidate).await {
                Admission::Admitted(_) => report.admitted += 1,
                Admission::Rejected(_) => report.rejected += 1,
            }
        }

        report.pool_size = self.pool_size().await;
        report.catalog_size = self.catalog.len().await;

        tracing::info!(
            fetched = report.fetched,
            admitted = report.admitted,
            catalog_size = report.catalog_size,
            "Catalog seeded"
        );

        TickOutcome::Completed(report)
    }

    /// Run one ingestion tick
    ///
    /// Skipped, not queued, when the previous tick is still running.
    pub async fn tick(&self) -> TickOutcome {
        let Some(_guard) = self.try_start() else {
            tracing::debug!("Previous tick still running, skipping");
            return TickOutcome::Skipped;
        };

        let mut report = TickReport::default();

        if self.pool.lock().await.is_empty() {
            report.fetched_batch = true;

            let batch = self
                .fetch(self.config.fetch_limit, self.config.fetch_per_source)
                .await;
            report.fetched = batch.len();

            let mut survivors = Vec::new();
            for candidate in batch.into_iter().filter(CatRecord::is_admissible) {
                report.valid += 1;
                if !self.catalog.is_duplicate(&candidate).await {
                    survivors.push(candidate);
                }
            }
            report.pooled = survivors.len();

            self.pool.lock().await.extend(survivors);

            tracing::debug!(
                fetched = report.fetched,
                valid = report.valid,
                pooled = report.pooled,
                "Pool refilled"
            );
        }

        while report.admitted < self.config.admit_per_tick {
            let Some(candidate) = self.pool.lock().await.pop_front() else {
                break;
            };

            match self.catalog.append(candidate).await {
                Admission::Admitted(record) => {
                    report.admitted += 1;
                    report.delivered += self.engine.publish(&record).await.delivered;

                    tracing::info!(id = %record.id, breed = %record.breed, "Cat added");
                }
                Admission::Rejected(reason) => {
                    report.rejected += 1;
                    tracing::debug!(reason = %reason, "Pooled candidate rejected");
                }
            }
        }

        report.pool_size = self.pool_size().await;
        report.catalog_size = self.catalog.len().await;

        tracing::info!(
            admitted = report.admitted,
            catalog_size = report.catalog_size,
            pool_size = report.pool_size,
            "Ingestion tick complete"
        );

        TickOutcome::Completed(report)
    }

    /// Spawn the recurring tick task
    ///
    /// The first tick fires one interval after spawning. Each tick runs as its
    /// own task, so a slow fetch never delays the timer; overlapping ticks are
    /// skipped by [`tick`](Self::tick). Abort the returned handle to stop.
    pub fn spawn(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let scheduler = Arc::clone(self);
        let period = scheduler.config.tick_interval;

        tracing::info!(interval_secs = period.as_secs(), "Starting ingestion loop");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let scheduler = Arc::clone(&scheduler);
                tokio::spawn(async move {
                    scheduler.tick().await;
                });
            }
        })
    }
}
