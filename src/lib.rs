//! # catfeed
//!
//! An append-only catalog of cat records, filled by a periodic ingestion
//! scheduler and fanned out live to feed subscribers, plus a chat relay.
//!
//! ```text
//!  CandidateSource ─► IngestionScheduler ─► Catalog
//!                                │
//!                                ▼
//!                        BroadcastEngine ─► SubscriptionRegistry ─► feeds
//!
//!  CatServer ─► CatService ─┬─► Catalog           (list, get)
//!                           ├─► SubscriptionRegistry (feeds)
//!                           └─► ChatRelay         (chat)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use catfeed::{
//!     BroadcastEngine, CatServer, CatService, Catalog, ChatRelay, IngestConfig,
//!     IngestionScheduler, ServerConfig, StaticSource, SubscriptionRegistry,
//! };
//!
//! #[tokio::main]
//! async fn main() -> catfeed::Result<()> {
//!     let catalog = Arc::new(Catalog::new());
//!     let registry = Arc::new(SubscriptionRegistry::new());
//!     let engine = Arc::new(BroadcastEngine::new(Arc::clone(&registry)));
//!
//!     let scheduler = Arc::new(IngestionScheduler::new(
//!         IngestConfig::default(),
//!         Arc::clone(&catalog),
//!         engine,
//!         StaticSource::new(Vec::new()),
//!     ));
//!     scheduler.spawn();
//!
//!     let service = Arc::new(CatService::new(catalog, registry, Arc::new(ChatRelay::new())));
//!     CatServer::new(ServerConfig::default(), service).run().await
//! }
//! ```

pub mod broadcast;
pub mod catalog;
pub mod chat;
pub mod error;
pub mod ingest;
pub mod registry;
pub mod server;
pub mod service;
pub mod stats;

pub use broadcast::{BroadcastEngine, PublishReport};
pub use catalog::{Admission, CatRecord, Catalog};
pub use chat::{ChatMessage, ChatRelay};
pub use error::{Error, Result};
pub use ingest::{CandidateSource, HttpSource, IngestConfig, IngestionScheduler, StaticSource};
pub use registry::{RegistryConfig, StreamClass, SubscriptionRegistry};
pub use server::{CatServer, ServerConfig};
pub use service::CatService;
