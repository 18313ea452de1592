//! Subscription registry implementation
//!
//! Live subscriber handles, grouped by stream class. Each class collection
//! has its own lock so that broadcasting (read-heavy) and connect/disconnect
//! churn (write-light) on different classes never contend.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::catalog::CatRecord;

use super::config::RegistryConfig;
use super::error::RegistryError;
use super::handle::{normalize_breed, StreamClass, SubscriberHandle, SubscriberId, Subscription};

type HandleSet = HashMap<SubscriberId, Arc<SubscriberHandle>>;

/// Subscriber counts per class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Full feed subscribers
    pub full_feed: usize,
    /// New-arrivals subscribers
    pub new_only: usize,
    /// Distinct breed filter keys in the breed index
    pub breed_keys: usize,
    /// Breed filter subscribers across all keys
    pub breed_subscribers: usize,
}

impl RegistryStats {
    /// Total number of registered subscribers
    pub fn total(&self) -> usize {
        self.full_feed + self.new_only + self.breed_subscribers
    }
}

/// Registry of live feed subscribers
///
/// Lock order is always `members` first, then the class collection.
pub struct SubscriptionRegistry {
    /// Which class each registered handle belongs to
    members: RwLock<HashMap<SubscriberId, StreamClass>>,

    full_feed: RwLock<HandleSet>,

    new_only: RwLock<HandleSet>,

    /// Breed index: normalized substring -> handles filtering on it.
    /// A key is present only while its set is non-empty.
    breeds: RwLock<HashMap<String, HandleSet>>,

    config: RegistryConfig,
}

impl SubscriptionRegistry {
    /// Create a registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            members: RwLock::new(HashMap::new()),
            full_feed: RwLock::new(HashMap::new()),
            new_only: RwLock::new(HashMap::new()),
            breeds: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a new subscriber for a stream class
    ///
    /// Breed filters are normalized; an empty filter is rejected and nothing
    /// is registered. Chat participants belong to the chat relay.
    pub async fn subscribe(&self, class: StreamClass) -> Result<Subscription, RegistryError> {
        let class = match class {
            StreamClass::BreedFilter(filter) => {
                let key = normalize_breed(&filter);
                if key.is_empty() {
                    return Err(RegistryError::InvalidArgument(
                        "breed parameter required".to_string(),
                    ));
                }
                StreamClass::BreedFilter(key)
            }
            other => other,
        };

        let (handle, subscription) =
            SubscriberHandle::channel(class.clone(), self.config.subscriber_buffer);
        let id = handle.id();

        let mut members = self.members.write().await;
        match &class {
            StreamClass::FullFeed => {
                self.full_feed.write().await.insert(id, handle);
            }
            StreamClass::NewOnly => {
                self.new_only.write().await.insert(id, handle);
            }
            StreamClass::BreedFilter(key) => {
                self.breeds
                    .write()
                    .await
                    .entry(key.clone())
                    .or_default()
                    .insert(id, handle);
            }
            StreamClass::Chat => {
                return Err(RegistryError::InvalidArgument(
                    "chat participants join the chat relay".to_string(),
                ));
            }
        }
        members.insert(id, class.clone());

        tracing::info!(
            subscriber = %id,
            class = %class,
            subscribers = members.len(),
            "Subscriber added"
        );

        Ok(subscription)
    }

    /// Remove a subscriber
    ///
    /// Idempotent: returns true only for the call that actually removed the
    /// handle. Safe to race from the connection's cleanup path and from a
    /// failed delivery.
    pub async fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut members = self.members.write().await;

        let Some(class) = members.remove(&id) else {
            return false;
        };

        let handle = match &class {
            StreamClass::FullFeed => self.full_feed.write().await.remove(&id),
            StreamClass::NewOnly => self.new_only.write().await.remove(&id),
            StreamClass::BreedFilter(key) => {
                let mut breeds = self.breeds.write().await;
                let removed = breeds.get_mut(key).and_then(|set| set.remove(&id));

                if breeds.get(key).is_some_and(|set| set.is_empty()) {
                    breeds.remove(key);
                    tracing::debug!(breed = %key, "Breed key pruned");
                }

                removed
            }
            StreamClass::Chat => None,
        };

        if let Some(handle) = handle {
            handle.begin_close();
            handle.mark_closed();
        }

        tracing::debug!(
            subscriber = %id,
            class = %class,
            subscribers = members.len(),
            "Subscriber removed"
        );

        true
    }

    /// Snapshot of every handle that should receive `record`
    ///
    /// Full feed and new-only handles always match; breed handles match when
    /// their key is a substring of the record's lower-cased breed. Locks are
    /// released before returning.
    pub async fn matching_handles(&self, record: &CatRecord) -> Vec<Arc<SubscriberHandle>> {
        let mut matched: Vec<Arc<SubscriberHandle>> =
            self.full_feed.read().await.values().cloned().collect();

        matched.extend(self.new_only.read().await.values().cloned());

        let breed = record.normalized_breed();
        let breeds = self.breeds.read().await;
        for (key, handles) in breeds.iter() {
            if breed.contains(key.as_str()) {
                matched.extend(handles.values().cloned());
            }
        }

        matched
    }

    /// Whether a subscriber is currently registered
    pub async fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.members.read().await.contains_key(&id)
    }

    /// Subscriber counts per class
    pub async fn stats(&self) -> RegistryStats {
        let full_feed = self.full_feed.read().await.len();
        let new_only = self.new_only.read().await.len();
        let breeds = self.breeds.read().await;

        RegistryStats {
            full_feed,
            new_only,
            breed_keys: breeds.len(),
            breed_subscribers: breeds.values().map(HashMap::len).sum(),
        }
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use tokio_test::assert_ok;

    use super::*;
    use crate::registry::HandleState;

    fn cat(breed: &str) -> CatRecord {
        CatRecord::candidate("test", format!("http://x/{}", breed), breed, "")
    }

    fn ids(handles: &[Arc<SubscriberHandle>]) -> HashSet<SubscriberId> {
        handles.iter().map(|h| h.id()).collect()
    }

    #[tokio::test]
    async fn test_empty_breed_rejected() {
        let registry = SubscriptionRegistry::new();

        for filter in ["", "   "] {
            let result = registry.subscribe(StreamClass::breed(filter)).await;
            assert!(matches!(result, Err(RegistryError::InvalidArgument(_))));
        }

        assert_eq!(registry.stats().await, RegistryStats::default());
    }

    #[tokio::test]
    async fn test_chat_class_rejected() {
        let registry = SubscriptionRegistry::new();

        let result = registry.subscribe(StreamClass::Chat).await;
        assert!(matches!(result, Err(RegistryError::InvalidArgument(_))));
        assert_eq!(registry.stats().await.total(), 0);
    }

    #[tokio::test]
    async fn test_matching_handles_by_class() {
        let registry = SubscriptionRegistry::new();

        let full = assert_ok!(registry.subscribe(StreamClass::FullFeed).await);
        let new = assert_ok!(registry.subscribe(StreamClass::NewOnly).await);
        let siamese = assert_ok!(registry.subscribe(StreamClass::breed("Siamese")).await);

        let matched = ids(&registry.matching_handles(&cat("Siamese Mix")).await);
        assert_eq!(matched, HashSet::from([full.id(), new.id(), siamese.id()]));

        let matched = ids(&registry.matching_handles(&cat("Persian")).await);
        assert_eq!(matched, HashSet::from([full.id(), new.id()]));
    }

    #[tokio::test]
    async fn test_breed_filter_is_substring_match() {
        let registry = SubscriptionRegistry::new();
        let short = registry.subscribe(StreamClass::breed("tab")).await.unwrap();

        let matched = registry.matching_handles(&cat("Domestic Tabby")).await;
        assert_eq!(ids(&matched), HashSet::from([short.id()]));

        let matched = registry.matching_handles(&cat("Bengal")).await;
        assert!(matched.is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        let sub = registry.subscribe(StreamClass::FullFeed).await.unwrap();
        let handle = registry.matching_handles(&cat("Tabby")).await.remove(0);

        assert!(registry.unsubscribe(sub.id()).await);
        assert!(!registry.unsubscribe(sub.id()).await);

        assert_eq!(handle.state(), HandleState::Closed);
        assert!(!registry.is_subscribed(sub.id()).await);
        assert!(registry.matching_handles(&cat("Tabby")).await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_unsubscribe_removes_once() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let sub = registry.subscribe(StreamClass::breed("siamese")).await.unwrap();
        let id = sub.id();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.unsubscribe(id).await })
            })
            .collect();

        let mut removals = 0;
        for task in tasks {
            if task.await.unwrap() {
                removals += 1;
            }
        }

        assert_eq!(removals, 1);
        assert!(registry
            .matching_handles(&cat("Siamese"))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_breed_key_pruned_after_last_subscriber() {
        let registry = SubscriptionRegistry::new();

        let first = registry.subscribe(StreamClass::breed("Persian")).await.unwrap();
        let second = registry.subscribe(StreamClass::breed("persian ")).await.unwrap();

        let stats = registry.stats().await;
        assert_eq!(stats.breed_keys, 1);
        assert_eq!(stats.breed_subscribers, 2);

        registry.unsubscribe(first.id()).await;
        assert_eq!(registry.stats().await.breed_keys, 1);

        registry.unsubscribe(second.id()).await;
        let stats = registry.stats().await;
        assert_eq!(stats.breed_keys, 0);
        assert_eq!(stats.breed_subscribers, 0);
    }

    #[tokio::test]
    async fn test_churn_leaves_no_keys() {
        let registry = SubscriptionRegistry::new();

        for i in 0..50 {
            let sub = registry
                .subscribe(StreamClass::breed(&format!("breed-{}", i)))
                .await
                .unwrap();
            registry.unsubscribe(sub.id()).await;
        }

        assert_eq!(registry.stats().await, RegistryStats::default());
    }

    #[tokio::test]
    async fn test_subscription_ends_after_unsubscribe() {
        let registry = SubscriptionRegistry::new();
        let mut sub = registry.subscribe(StreamClass::NewOnly).await.unwrap();

        registry.unsubscribe(sub.id()).await;

        // The registry held the only sender
        assert!(sub.recv().await.is_none());
    }
}
