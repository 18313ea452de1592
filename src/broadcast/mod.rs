//! Fan-out of admitted records to live subscribers
//!
//! `publish` takes a snapshot of the matching handles, releases every
//! registry lock, then tries a non-blocking send per handle. A failed send
//! removes that subscriber and the loop moves on, so publish time depends
//! only on the number of matching handles, never on how fast they drain.

use std::sync::Arc;

use crate::catalog::CatRecord;
use crate::registry::{Delivery, StreamClass, SubscriptionRegistry};

/// Result of one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that accepted the record
    pub delivered: usize,
    /// Subscribers removed because delivery failed
    pub dropped: usize,
}

/// Routes admitted records to subscribers
pub struct BroadcastEngine {
    registry: Arc<SubscriptionRegistry>,
}

impl BroadcastEngine {
    /// Create an engine publishing through `registry`
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    /// Get the subscription registry
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Deliver a newly admitted record to every matching subscriber
    ///
    /// New-only subscribers receive [`Delivery::Added`]; full feed and breed
    /// subscribers receive [`Delivery::Cat`].
    pub async fn publish(&self, record: &Arc<CatRecord>) -> PublishReport {
        let handles = self.registry.matching_handles(record).await;
        let mut report = PublishReport::default();

        for handle in handles {
            let delivery = match handle.class() {
                StreamClass::NewOnly => Delivery::Added(Arc::clone(record)),
                _ => Delivery::Cat(Arc::clone(record)),
            };

            match handle.try_deliver(delivery) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    handle.begin_close();
                    if self.registry.unsubscribe(handle.id()).await {
                        report.dropped += 1;
                    }
                    tracing::debug!(
                        subscriber = %handle.id(),
                        class = %handle.class(),
                        error = %e,
                        "Delivery failed, subscriber dropped"
                    );
                }
            }
        }

        tracing::debug!(
            id = %record.id,
            breed = %record.breed,
            delivered = report.delivered,
            dropped = report.dropped,
            "Record published"
        );

        report
    }
}
