//! Cat service
//!
//! The operations exposed to clients, independent of transport: listing and
//! point lookup on the catalog, the three record feeds, and chat.
//!
//! | Operation              | Backlog                 | Live deliveries        |
//! |------------------------|-------------------------|------------------------|
//! | `stream_cat_feed`      | whole catalog           | every admission        |
//! | `stream_cats_by_breed` | catalog matches         | matching admissions    |
//! | `stream_new_cats`      | none                    | every admission, added |
//! | `cat_chat`             | none                    | chat messages          |

pub mod stream;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::catalog::{CatRecord, Catalog, CatalogError};
use crate::chat::ChatRelay;
use crate::registry::{normalize_breed, RegistryError, StreamClass, SubscriptionRegistry};

pub use stream::{ChatSession, FeedStream};

/// Error type for service operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The request is malformed; nothing was opened or changed
    #[error("{0}")]
    InvalidArgument(String),

    /// The requested record does not exist
    #[error("{0}")]
    NotFound(String),
}

impl ServiceError {
    /// Stable error code for the wire
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ServiceError::NotFound(_) => "NOT_FOUND",
        }
    }
}

impl From<RegistryError> for ServiceError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::InvalidArgument(message) => ServiceError::InvalidArgument(message),
        }
    }
}

impl From<CatalogError> for ServiceError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(_) => ServiceError::NotFound("Cat not found".to_string()),
        }
    }
}

/// Catalog snapshot with its size
#[derive(Debug, Clone)]
pub struct CatList {
    pub cats: Vec<Arc<CatRecord>>,
    pub total: usize,
}

/// Answer to an add-source request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddSourceReply {
    pub ok: bool,
    pub message: String,
}

/// Client-facing operations over the catalog, registry and chat relay
pub struct CatService {
    catalog: Arc<Catalog>,
    registry: Arc<SubscriptionRegistry>,
    chat: Arc<ChatRelay>,
}

impl CatService {
    /// Create a service over shared components
    pub fn new(
        catalog: Arc<Catalog>,
        registry: Arc<SubscriptionRegistry>,
        chat: Arc<ChatRelay>,
    ) -> Self {
        Self {
            catalog,
            registry,
            chat,
        }
    }

    /// Get the catalog
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Get the subscription registry
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Get the chat relay
    pub fn chat(&self) -> &Arc<ChatRelay> {
        &self.chat
    }

    /// Every record in admission order
    pub async fn list_cats(&self) -> CatList {
        let cats = self.catalog.list().await;
        CatList {
            total: cats.len(),
            cats,
        }
    }

    /// One record by id
    pub async fn get_cat(&self, id: &str) -> Result<Arc<CatRecord>, ServiceError> {
        Ok(self.catalog.get(id).await?)
    }

    /// Acknowledge a source registration
    ///
    /// Name and type are required. The acknowledgement does not change what
    /// the scheduler fetches.
    pub fn add_source(&self, name: &str, url: &str, kind: &str) -> AddSourceReply {
        if name.trim().is_empty() || kind.trim().is_empty() {
            return AddSourceReply {
                ok: false,
                message: "name & type required".to_string(),
            };
        }

        tracing::info!(name = %name, url = %url, kind = %kind, "Source registration acknowledged");

        AddSourceReply {
            ok: true,
            message: format!("Source {} added", name),
        }
    }

    /// The whole catalog, then every future admission
    pub async fn stream_cat_feed(&self) -> Result<FeedStream, ServiceError> {
        let subscription = self.registry.subscribe(StreamClass::FullFeed).await?;
        let backlog = self.catalog.list().await;

        Ok(FeedStream::new(subscription, Arc::clone(&self.registry), backlog))
    }

    /// Current and future records whose breed contains `breed`
    ///
    /// Fails with `InvalidArgument` for a blank filter, before anything is
    /// registered.
    pub async fn stream_cats_by_breed(&self, breed: &str) -> Result<FeedStream, ServiceError> {
        let key = normalize_breed(breed);
        let subscription = self.registry.subscribe(StreamClass::BreedFilter(key.clone())).await?;

        let backlog: Vec<_> = self
            .catalog
            .list()
            .await
            .into_iter()
            .filter(|record| record.normalized_breed().contains(key.as_str()))
            .collect();

        tracing::debug!(breed = %key, matches = backlog.len(), "Breed stream opened");

        Ok(FeedStream::new(subscription, Arc::clone(&self.registry), backlog))
    }

    /// Future admissions only, as "added" events
    pub async fn stream_new_cats(&self) -> Result<FeedStream, ServiceError> {
        let subscription = self.registry.subscribe(StreamClass::NewOnly).await?;

        Ok(FeedStream::new(subscription, Arc::clone(&self.registry), Vec::new()))
    }

    /// Join the chat
    pub async fn cat_chat(&self) -> ChatSession {
        let subscription = self.chat.join().await;
        ChatSession::new(subscription, Arc::clone(&self.chat))
    }
}
