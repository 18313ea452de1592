//! Candidate ingestion
//!
//! ```text
//!   CandidateSource ──fetch (pool empty)──► filter ──► dedup ──► pool
//!                                                               │
//!          every tick_interval: admit up to admit_per_tick ◄────┘
//!                                   │
//!                        Catalog::append ──► BroadcastEngine::publish
//! ```
//!
//! Source failures are logged and treated as an empty batch; nothing in this
//! module can fail the server.

pub mod config;
pub mod http;
pub mod scheduler;
pub mod source;

pub use config::IngestConfig;
pub use http::HttpSource;
pub use scheduler::IngestionScheduler;
pub use source::{CandidateSource, SourceError, StaticSource};
