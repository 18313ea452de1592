//! Chat relay implementation

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::registry::{
    Delivery, RegistryConfig, StreamClass, SubscriberHandle, SubscriberId, Subscription,
};

use super::message::{ChatMessage, InboundChat};

/// Fans chat messages out to every joined participant
///
/// Sends are serialized through `send_lock`, so every participant observes
/// messages in the same order. The participant set has its own lock and is
/// only held long enough to take a snapshot.
pub struct ChatRelay {
    participants: RwLock<HashMap<SubscriberId, Arc<SubscriberHandle>>>,
    send_lock: Mutex<()>,
    config: RegistryConfig,
}

impl ChatRelay {
    /// Create a relay with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a relay with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            participants: RwLock::new(HashMap::new()),
            send_lock: Mutex::new(()),
            config,
        }
    }

    /// Join the chat; only messages sent from now on are received
    pub async fn join(&self) -> Subscription {
        let (handle, subscription) =
            SubscriberHandle::channel(StreamClass::Chat, self.config.subscriber_buffer);

        let mut participants = self.participants.write().await;
        participants.insert(handle.id(), handle);

        tracing::info!(
            participant = %subscription.id(),
            participants = participants.len(),
            "Chat participant joined"
        );

        subscription
    }

    /// Stamp and relay a message to every participant, sender included
    ///
    /// Returns `None` without relaying when `from` is not a participant.
    pub async fn send(&self, from: SubscriberId, inbound: InboundChat) -> Option<ChatMessage> {
        let _ordering = self.send_lock.lock().await;

        let participants: Vec<Arc<SubscriberHandle>> = {
            let participants = self.participants.read().await;
            if !participants.contains_key(&from) {
                return None;
            }
            participants.values().cloned().collect()
        };

        let message = ChatMessage::stamp(inbound);
        let shared = Arc::new(message.clone());

        for participant in participants {
            if let Err(e) = participant.try_deliver(Delivery::Chat(Arc::clone(&shared))) {
                tracing::debug!(
                    participant = %participant.id(),
                    error = %e,
                    "Chat delivery failed, participant dropped"
                );
                self.leave(participant.id()).await;
            }
        }

        Some(message)
    }

    /// Remove a participant; returns true only for the call that removed it
    pub async fn leave(&self, id: SubscriberId) -> bool {
        let mut participants = self.participants.write().await;

        match participants.remove(&id) {
            Some(handle) => {
                handle.begin_close();
                handle.mark_closed();
                tracing::info!(
                    participant = %id,
                    participants = participants.len(),
                    "Chat participant left"
                );
                true
            }
            None => false,
        }
    }

    /// Number of joined participants
    pub async fn participant_count(&self) -> usize {
        self.participants.read().await.len()
    }
}

impl Default for ChatRelay {
    fn default() -> Self {
        Self::new()
    }
}
