//! Statistics for ingestion ticks and the server

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Outcome of one ingestion tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick ran to completion
    Completed(TickReport),
    /// A previous tick was still running; nothing was done
    Skipped,
}

impl TickOutcome {
    /// The report, if the tick ran
    pub fn report(&self) -> Option<&TickReport> {
        match self {
            TickOutcome::Completed(report) => Some(report),
            TickOutcome::Skipped => None,
        }
    }
}

/// Counters for one ingestion tick (or the seeding pass)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Whether the source was asked for a batch
    pub fetched_batch: bool,
    /// Candidates returned by the source
    pub fetched: usize,
    /// Candidates with a breed and a url
    pub valid: usize,
    /// Candidates that survived dedup and entered the pool
    pub pooled: usize,
    /// Records admitted to the catalog
    pub admitted: usize,
    /// Pool entries rejected by the catalog at admission
    pub rejected: usize,
    /// Subscribers reached by this tick's publishes
    pub delivered: usize,
    /// Pool size after the tick
    pub pool_size: usize,
    /// Catalog size after the tick
    pub catalog_size: usize,
}

/// Server-wide counters
///
/// Updated lock-free from connection tasks.
#[derive(Debug)]
pub struct ServerStats {
    started_at: Instant,
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    rejected_connections: AtomicU64,
}

impl ServerStats {
    /// Zeroed counters; uptime starts now
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            rejected_connections: AtomicU64::new(0),
        }
    }

    /// Count an accepted connection
    pub(crate) fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> ServerStatsSnapshot {
        ServerStatsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of [`ServerStats`] at one instant
#[derive(Debug, Clone, Copy)]
pub struct ServerStatsSnapshot {
    /// Connections accepted since start
    pub total_connections: u64,
    /// Connections currently open
    pub active_connections: u64,
    /// Connections refused by the connection limit
    pub rejected_connections: u64,
    /// Time since the server was created
    pub uptime: Duration,
}
