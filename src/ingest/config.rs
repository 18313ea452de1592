//! Ingestion configuration

use std::time::Duration;

/// Configuration for seeding and the periodic ingestion tick
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Time between ticks
    pub tick_interval: Duration,

    /// Total candidates requested by the startup seed
    pub seed_limit: usize,

    /// Per sub-source cap for the startup seed
    pub seed_per_source: usize,

    /// Total candidates requested when the pool runs dry
    pub fetch_limit: usize,

    /// Per sub-source cap for tick fetches
    pub fetch_per_source: usize,

    /// Records admitted from the pool per tick
    pub admit_per_tick: usize,

    /// Upper bound on one source fetch
    pub fetch_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            seed_limit: 30,
            seed_per_source: 10,
            fetch_limit: 100,
            fetch_per_source: 30,
            admit_per_tick: 2,
            fetch_timeout: Duration::from_secs(60),
        }
    }
}

impl IngestConfig {
    /// Set the tick interval
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the seed fetch size and per sub-source cap
    pub fn seed(mut self, limit: usize, per_source: usize) -> Self {
        self.seed_limit = limit;
        self.seed_per_source = per_source;
        self
    }

    /// Set the tick fetch size and per sub-source cap
    pub fn fetch(mut self, limit: usize, per_source: usize) -> Self {
        self.fetch_limit = limit;
        self.fetch_per_source = per_source;
        self
    }

    /// Set the admission quota per tick
    pub fn admit_per_tick(mut self, quota: usize) -> Self {
        self.admit_per_tick = quota;
        self
    }

    /// Set the source fetch timeout
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}
