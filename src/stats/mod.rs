//! Counters for ingestion ticks and server connections

pub mod metrics;

pub use metrics::{ServerStats, ServerStatsSnapshot, TickOutcome, TickReport};
