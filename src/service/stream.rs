//! Open feed and chat streams
//!
//! A [`FeedStream`] first replays its backlog (a catalog snapshot taken after
//! registration) and then forwards live deliveries. Records admitted between
//! registration and the snapshot show up on both sides; they are dropped from
//! the live side by id, so the subscriber sees every record exactly once and
//! in admission order.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::catalog::CatRecord;
use crate::chat::{ChatMessage, ChatRelay, InboundChat};
use crate::registry::{Delivery, StreamClass, SubscriberId, Subscription, SubscriptionRegistry};

/// A live record stream for one connection
///
/// Call [`close`](Self::close) when the connection ends. A stream dropped
/// without closing is still cleaned up, by the next publish that finds its
/// receiver gone.
pub struct FeedStream {
    backlog: VecDeque<Arc<CatRecord>>,
    /// Backlog ids that may still arrive live
    seen: HashSet<String>,
    subscription: Subscription,
    registry: Arc<SubscriptionRegistry>,
}

impl FeedStream {
    pub(crate) fn new(
        subscription: Subscription,
        registry: Arc<SubscriptionRegistry>,
        backlog: Vec<Arc<CatRecord>>,
    ) -> Self {
        let seen = backlog.iter().map(|record| record.id.clone()).collect();

        Self {
            backlog: backlog.into(),
            seen,
            subscription,
            registry,
        }
    }

    /// Subscriber id of this stream
    pub fn id(&self) -> SubscriberId {
        self.subscription.id()
    }

    /// Stream class of this feed
    pub fn class(&self) -> &StreamClass {
        self.subscription.class()
    }

    /// Records still to be replayed before live deliveries
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Next item, or `None` once the subscriber has been removed
    ///
    /// Cancel safe.
    pub async fn next(&mut self) -> Option<Delivery> {
        if let Some(record) = self.backlog.pop_front() {
            return Some(Delivery::Cat(record));
        }

        loop {
            let delivery = self.subscription.recv().await?;

            if !self.seen.is_empty() {
                if let Some(record) = delivery.record() {
                    if self.seen.remove(&record.id) {
                        continue;
                    }
                }
                // Everything from here on was admitted after the snapshot
                self.seen.clear();
            }

            return Some(delivery);
        }
    }

    /// Unsubscribe; returns true the first time
    pub async fn close(&mut self) -> bool {
        self.registry.unsubscribe(self.id()).await
    }
}

impl std::fmt::Debug for FeedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedStream")
            .field("id", &self.id())
            .field("class", self.class())
            .field("backlog", &self.backlog.len())
            .finish_non_exhaustive()
    }
}

/// A joined chat participant
pub struct ChatSession {
    subscription: Subscription,
    relay: Arc<ChatRelay>,
}

impl ChatSession {
    pub(crate) fn new(subscription: Subscription, relay: Arc<ChatRelay>) -> Self {
        Self {
            subscription,
            relay,
        }
    }

    /// Participant id of this session
    pub fn id(&self) -> SubscriberId {
        self.subscription.id()
    }

    /// Relay a message to every participant; `None` after leaving
    pub async fn send(&self, inbound: InboundChat) -> Option<ChatMessage> {
        self.relay.send(self.id(), inbound).await
    }

    /// Next relayed message, or `None` once this participant has left
    ///
    /// Cancel safe.
    pub async fn next(&mut self) -> Option<Arc<ChatMessage>> {
        loop {
            match self.subscription.recv().await? {
                Delivery::Chat(message) => return Some(message),
                _ => continue,
            }
        }
    }

    /// Leave the chat; returns true the first time
    pub async fn leave(&self) -> bool {
        self.relay.leave(self.id()).await
    }
}
