//! Subscriber handles and stream classes
//!
//! A [`SubscriberHandle`] is the server-side sink for one connection, and a
//! [`Subscription`] is the matching receiving end owned by the connection
//! task. Handles are created together with their subscription and are never
//! reused.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::catalog::CatRecord;
use crate::chat::ChatMessage;

use super::error::DeliveryError;

/// Unique identifier for a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalize a breed filter: trimmed and lower-cased
pub fn normalize_breed(breed: &str) -> String {
    breed.trim().to_lowercase()
}

/// Which published records a subscriber receives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamClass {
    /// Every admitted record
    FullFeed,
    /// Every admitted record, tagged as an "added" event
    NewOnly,
    /// Records whose lower-cased breed contains this substring
    BreedFilter(String),
    /// Chat relay participant
    Chat,
}

impl StreamClass {
    /// Breed filter class with a normalized key
    pub fn breed(filter: &str) -> Self {
        StreamClass::BreedFilter(normalize_breed(filter))
    }
}

impl std::fmt::Display for StreamClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamClass::FullFeed => write!(f, "full-feed"),
            StreamClass::NewOnly => write!(f, "new-only"),
            StreamClass::BreedFilter(key) => write!(f, "breed:{}", key),
            StreamClass::Chat => write!(f, "chat"),
        }
    }
}

/// Lifecycle state of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Registered and receiving
    Active,
    /// Cancelled or failed, cleanup pending
    Closing,
    /// Removed from the registry
    Closed,
}

impl HandleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => HandleState::Active,
            1 => HandleState::Closing,
            _ => HandleState::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            HandleState::Active => 0,
            HandleState::Closing => 1,
            HandleState::Closed => 2,
        }
    }
}

/// One item sent to a subscriber
#[derive(Debug, Clone)]
pub enum Delivery {
    /// A record (full feed and breed filters)
    Cat(Arc<CatRecord>),
    /// A newly admitted record (new-only feed)
    Added(Arc<CatRecord>),
    /// A relayed chat message
    Chat(Arc<ChatMessage>),
}

impl Delivery {
    /// The record carried by this delivery, if any
    pub fn record(&self) -> Option<&Arc<CatRecord>> {
        match self {
            Delivery::Cat(record) | Delivery::Added(record) => Some(record),
            Delivery::Chat(_) => None,
        }
    }
}

/// Server-side sink for one subscriber
#[derive(Debug)]
pub struct SubscriberHandle {
    id: SubscriberId,
    class: StreamClass,
    tx: mpsc::Sender<Delivery>,
    state: AtomicU8,
}

impl SubscriberHandle {
    /// Create a handle and its receiving subscription
    pub fn channel(class: StreamClass, capacity: usize) -> (Arc<Self>, Subscription) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = SubscriberId::new();

        let handle = Arc::new(Self {
            id,
            class: class.clone(),
            tx,
            state: AtomicU8::new(HandleState::Active.as_u8()),
        });

        (handle, Subscription { id, class, rx })
    }

    /// Get the subscriber id
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Get the stream class
    pub fn class(&self) -> &StreamClass {
        &self.class
    }

    /// Current lifecycle state
    pub fn state(&self) -> HandleState {
        HandleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether deliveries are still accepted
    pub fn is_active(&self) -> bool {
        self.state() == HandleState::Active
    }

    /// Send without waiting
    ///
    /// Fails when the handle is no longer active, the receiver is gone, or
    /// the outbound buffer is full.
    pub fn try_deliver(&self, delivery: Delivery) -> Result<(), DeliveryError> {
        if !self.is_active() {
            return Err(DeliveryError::Inactive);
        }

        self.tx.try_send(delivery).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Move Active -> Closing. Returns true for the caller that won.
    pub fn begin_close(&self) -> bool {
        self.state
            .compare_exchange(
                HandleState::Active.as_u8(),
                HandleState::Closing.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Final state, set once the registry dropped the handle
    pub(crate) fn mark_closed(&self) {
        self.state
            .store(HandleState::Closed.as_u8(), Ordering::Release);
    }
}

/// Receiving end of a subscriber handle
///
/// `recv` returns `None` once the handle has been removed and every
/// in-flight snapshot holding it is gone.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    class: StreamClass,
    rx: mpsc::Receiver<Delivery>,
}

impl Subscription {
    /// Get the subscriber id
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Get the stream class
    pub fn class(&self) -> &StreamClass {
        &self.class
    }

    /// Wait for the next delivery
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }

    /// Take a delivery if one is buffered
    pub fn try_recv(&mut self) -> Option<Delivery> {
        self.rx.try_recv().ok()
    }
}
